//! Loader program evaluated by the runtime
//!
//! The program text never changes. The entry path and the serialized
//! options reach it through the environment and are removed from
//! `process.env` before the package code runs.

/// Absolute path of the module to load
pub const ENTRY_ENV: &str = "DX_ENTRY_POINT";

/// JSON-encoded `CommandOptions`
pub const INVOCATION_ENV: &str = "DX_INVOCATION";

/// File the loader writes a reason into when it cannot start the command
pub const REPORT_ENV: &str = "DX_LOAD_REPORT";

/// Exit code the loader uses when the module exposes nothing callable
pub const NOT_CALLABLE_EXIT_CODE: i32 = 70;

pub const BOOTSTRAP: &str = r#"'use strict';
const entry = process.env.DX_ENTRY_POINT;
const invocation = JSON.parse(process.env.DX_INVOCATION || 'null');
const report = process.env.DX_LOAD_REPORT;
delete process.env.DX_ENTRY_POINT;
delete process.env.DX_INVOCATION;
delete process.env.DX_LOAD_REPORT;

const fail = (err) => {
  console.error(err && err.stack ? err.stack : String(err));
  process.exitCode = 1;
};

const pick = (m) => {
  if (typeof m === 'function') return m;
  if (m && typeof m.run === 'function') return m.run.bind(m);
  if (m && typeof m.default === 'function') return m.default;
  return null;
};

let run = null;
try {
  run = pick(require(entry));
  if (!run) {
    const reason = 'module does not export a function, run or default';
    if (report) require('fs').writeFileSync(report, reason);
    else console.error(entry + ': ' + reason);
    process.exitCode = 70;
  }
} catch (err) {
  fail(err);
}

if (run) {
  Promise.resolve()
    .then(() => run(invocation))
    .then((code) => {
      if (Number.isInteger(code)) process.exitCode = code;
    })
    .catch(fail);
}
"#;
