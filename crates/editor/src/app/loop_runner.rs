use std::process::ExitCode;

use builder_engine::run_app;
use tracing::{error, info};

use super::bootstrap::AppWiring;

/// Writes the bundle when `--export` was given, otherwise opens the preview.
pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring {
        config,
        mut session,
        asset_root,
        export,
    } = app;

    if let Some(output) = export {
        let result = session.export_bundle(&asset_root, &output);
        session.shutdown();
        return match result {
            Ok(summary) => {
                info!(
                    output = %summary.output.display(),
                    files = summary.manifest.files.len(),
                    skipped_remote = summary.skipped_remote.len(),
                    "export_written"
                );
                ExitCode::SUCCESS
            }
            Err(err) => {
                error!(error = %err, output = %output.display(), "export_failed");
                ExitCode::FAILURE
            }
        };
    }

    if let Err(err) = run_app(config, session) {
        error!(error = %err, "preview_failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
