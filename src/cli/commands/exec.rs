//! Package-backed commands: map, prepare, dispatch

use crate::config::{CommandConfig, Config, Settings};
use crate::dispatch::{CommandDispatcher, CommandOptions};
use crate::error::{DxError, DxResult};
use crate::package::{
    Installer, NpmInstaller, Outcome, PackageManager, PackageSpec, VersionResolver,
};
use crate::registry::{HttpRegistry, Registry};
use crate::ui::{self, InstallProgress, UiContext};
use crate::update;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Upper bound for the self-update lookup, so an offline registry does not
/// stall every command
const UPDATE_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Switches from the command line that shape one invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecFlags {
    pub no_update: bool,
    pub skip_update_check: bool,
}

/// Run the package-backed command named by `argv[0]` with the rest of `argv`
pub async fn execute(
    argv: Vec<String>,
    config: &Config,
    settings: &Settings,
    flags: ExecFlags,
) -> DxResult<()> {
    let (name, rest) = argv
        .split_first()
        .ok_or_else(|| DxError::InvalidRequest("no command given".to_string()))?;
    let command = config
        .commands
        .get(name)
        .ok_or_else(|| DxError::UnknownCommand(name.clone()))?;

    let ctx = UiContext::detect();

    if config.general.update_check && !flags.skip_update_check && settings.target_path.is_none() {
        notify_update(&ctx, config, settings).await;
    }

    let spec = package_spec(command, settings)?;
    let refresh = config.general.auto_update && !flags.no_update;

    let registry: Arc<dyn Registry> =
        Arc::new(HttpRegistry::new(&settings.registry_url, settings.timeout));
    let progress = Arc::new(InstallProgress::new(&ctx, spec.name()));
    let sink = progress.clone();
    let installer: Arc<dyn Installer> = Arc::new(
        NpmInstaller::new(&settings.installer_program, settings.install_timeout)
            .with_output(Arc::new(move |line: &str| sink.on_line(line))),
    );
    let manager = PackageManager::new(VersionResolver::new(registry), installer);

    let prepared = manager.prepare(&spec, refresh).await;
    progress.finish();
    let ready = prepared?;

    if let Some(version) = &ready.version {
        let label = format!("{}@{}", ready.spec.name(), version);
        match ready.outcome {
            Outcome::Installed => ui::step_ok(&ctx, &format!("Installed {label}")),
            Outcome::Updated => ui::step_ok(&ctx, &format!("Updated to {label}")),
            Outcome::Ready => debug!("Using cached {}", label),
        }
    }

    let dispatcher = CommandDispatcher::new(&settings.runtime, settings.min_runtime_version.clone());
    let entry = dispatcher.locate_entry_point(&ready.path)?;
    dispatcher.check_runtime().await?;

    let options = CommandOptions::parse(name.as_str(), rest);
    let mut env = BTreeMap::new();
    env.insert("DX_HOME".to_string(), settings.home.display().to_string());
    env.insert("DX_PACKAGE_PATH".to_string(), ready.path.display().to_string());

    dispatcher.invoke(&entry, &options, &env).await
}

/// Build the package request for `command` in direct or cache mode
pub fn package_spec(command: &CommandConfig, settings: &Settings) -> DxResult<PackageSpec> {
    match &settings.target_path {
        Some(target) => PackageSpec::new(&command.package, &command.version, target, None),
        None => PackageSpec::new(
            &command.package,
            &command.version,
            settings.dependencies_dir(),
            Some(settings.store_dir()),
        ),
    }
}

async fn notify_update(ctx: &UiContext, config: &Config, settings: &Settings) {
    let registry = HttpRegistry::new(
        &settings.registry_url,
        settings.timeout.min(UPDATE_CHECK_TIMEOUT),
    );
    if let Some(newer) = update::check_quietly(&registry, &config.general.self_package).await {
        ui::step_warn_hint(
            ctx,
            &format!("dx {} is available (you have {})", newer, env!("CARGO_PKG_VERSION")),
            &format!("npm install -g {}", config.general.self_package),
        );
    }
}
