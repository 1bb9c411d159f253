mod bootstrap;

use anyhow::Result;
use tracing::info;

use dash_core::models::DateRange;
use dash_core::settings::{Settings, SourceLocation};
use dash_core::time_utils::TimezoneHandler;
use dash_runtime::assembler::{Dashboard, ViewReport};
use dash_runtime::data_manager::DataManager;
use dash_runtime::source::{DataSource, DirectorySource, HttpSource};
use dash_runtime::views::ViewKind;
use dash_ui::app::{App, UiConfig};
use dash_ui::themes::Theme;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();
    let tui = settings.output == "tui";

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(
        &settings.log_level,
        &bootstrap::log_target(settings.log_file.as_ref(), tui),
    )?;

    info!("billing-dash v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        view = %settings.view,
        output = %settings.output,
        timezone = %settings.timezone,
        cache_ttl = settings.cache_ttl,
        "settings loaded"
    );

    let view: ViewKind = settings.view.parse()?;
    let mut dashboard = build_dashboard(&settings)?;

    if tui {
        let mut config = UiConfig::new(Theme::from_name(&settings.theme), view);
        config.start = settings.start;
        config.end = settings.end;
        config.columns = settings.columns.clone();
        App::new(dashboard, config).run()?;
    } else {
        let report = report_once(&mut dashboard, view, &settings)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    info!("billing-dash exiting");
    Ok(())
}

fn build_dashboard(settings: &Settings) -> Result<Dashboard> {
    let source: Box<dyn DataSource> = match settings.source_location() {
        SourceLocation::Directory(dir) => Box::new(DirectorySource::new(dir)),
        SourceLocation::Http(url) => Box::new(HttpSource::new(&url)?),
    };
    let manager = DataManager::new(source, settings.cache_ttl);
    let tz = TimezoneHandler::new(&settings.timezone);
    Ok(Dashboard::new(manager, tz))
}

/// Compute one view for JSON output, filling a missing bound from the
/// observed range.
fn report_once(dashboard: &mut Dashboard, view: ViewKind, settings: &Settings) -> Result<ViewReport> {
    let columns = settings.columns.as_deref();
    let range = match (settings.start, settings.end) {
        (Some(start), Some(end)) => Some(DateRange::new(start, end)),
        (None, None) => None,
        (start, end) => {
            let observed = dashboard.run_view(view, None, columns)?.range;
            observed.map(|o| DateRange::new(start.unwrap_or(o.start), end.unwrap_or(o.end)))
        }
    };
    Ok(dashboard.run_view(view, range, columns)?)
}
