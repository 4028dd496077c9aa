//! The session event loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use catalog::loader::{fetch_all, FeedFetch, FeedSource};
use catalog::project::{AdminLevel, Category};
use compute::dashboard::DashboardSurface;
use foundation::ids::ProjectId;
use scene::surface::MapSurface;
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep_until, MissedTickBehavior};
use tracing::{info, warn};

use crate::boundaries::load_boundary;
use crate::config::{parse_level, AppConfig};
use crate::refresh::RefreshGate;
use crate::session::Session;

/// User input understood by the loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ToggleCategory(Category),
    Search(String),
    Layer(AdminLevel),
    SelectArea { level: AdminLevel, name: String },
    ClearArea,
    Click(ProjectId),
    Refresh,
    Status,
    Quit,
}

impl Command {
    /// One command per line: `toggle tower`, `search kota`, `layer dun`,
    /// `area district Tawau`, `clear`, `click tower_3`, `refresh`, `status`,
    /// `quit`.
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        match verb.to_ascii_lowercase().as_str() {
            "toggle" => {
                let category = Category::parse(rest);
                if category == Category::Unknown && !rest.eq_ignore_ascii_case("unknown") {
                    return Err(format!("unknown category: {rest:?}"));
                }
                Ok(Command::ToggleCategory(category))
            }
            "search" => Ok(Command::Search(rest.to_string())),
            "layer" => parse_level(rest)
                .map(Command::Layer)
                .ok_or_else(|| format!("unknown layer: {rest:?}")),
            "area" => {
                let (level, name) = rest
                    .split_once(char::is_whitespace)
                    .ok_or_else(|| "usage: area <layer> <name>".to_string())?;
                let level = parse_level(level).ok_or_else(|| format!("unknown layer: {level:?}"))?;
                Ok(Command::SelectArea {
                    level,
                    name: name.trim().to_string(),
                })
            }
            "clear" => Ok(Command::ClearArea),
            "click" if !rest.is_empty() => Ok(Command::Click(ProjectId::new(rest))),
            "refresh" => Ok(Command::Refresh),
            "status" => Ok(Command::Status),
            "quit" | "exit" => Ok(Command::Quit),
            _ => Err(format!("unknown command: {line:?}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub refresh_interval: Duration,
    pub boundary_dir: PathBuf,
    pub initial_layer: AdminLevel,
}

impl From<&AppConfig> for RunOptions {
    fn from(config: &AppConfig) -> Self {
        Self {
            refresh_interval: config.refresh_interval,
            boundary_dir: config.boundary_dir.clone(),
            initial_layer: config.initial_layer,
        }
    }
}

pub type FeedSources = Arc<Vec<Arc<dyn FeedSource>>>;

/// Runs the session until [`Command::Quit`].
///
/// Feeds and boundary layers load concurrently; layers are installed as they
/// arrive. Markers are created one batch per loop turn so commands and
/// timers stay responsive during bulk loads.
pub async fn run<M: MapSurface, D: DashboardSurface>(
    session: &mut Session<M, D>,
    sources: FeedSources,
    options: RunOptions,
    mut commands: mpsc::Receiver<Command>,
) {
    session.activate_layer(options.initial_layer);

    let (layer_tx, mut layer_rx) = mpsc::channel(AdminLevel::ALL.len());
    for level in AdminLevel::ALL {
        let tx = layer_tx.clone();
        let dir = options.boundary_dir.clone();
        tokio::spawn(async move {
            let result = load_boundary(&dir, level).await;
            let _ = tx.send((level, result)).await;
        });
    }
    drop(layer_tx);

    let (fetch_tx, mut fetch_rx) = mpsc::channel::<Vec<FeedFetch>>(1);
    let mut gate = RefreshGate::new();
    start_fetch(&mut gate, &sources, &fetch_tx);

    let first_tick = tokio::time::Instant::now() + options.refresh_interval;
    let mut ticker = interval_at(first_tick, options.refresh_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut layers_open = true;
    let mut commands_open = true;
    loop {
        let dashboard_due = session
            .dashboard_deadline()
            .map(tokio::time::Instant::from_std);
        let markers_pending = session.pending_markers() > 0;

        tokio::select! {
            Some(fetched) = fetch_rx.recv() => {
                let now = Instant::now();
                let elapsed = gate.finish(now).map(|d| d.as_millis() as u64);
                let summary = session.ingest(fetched, now);
                info!(
                    initial = summary.initial,
                    elapsed_ms = elapsed,
                    metrics = %session.metrics(),
                    "refresh cycle complete"
                );
            }
            layer = layer_rx.recv(), if layers_open => match layer {
                Some((level, Ok(collection))) => {
                    session.install_boundary(level, collection);
                }
                Some((level, Err(err))) => {
                    warn!(layer = %level, %err, "boundary layer unavailable");
                }
                None => layers_open = false,
            },
            _ = ticker.tick() => {
                if !start_fetch(&mut gate, &sources, &fetch_tx) {
                    session.record_skipped_refresh();
                    info!("refresh skipped; previous cycle still running");
                }
            }
            command = commands.recv(), if commands_open => match command {
                None => commands_open = false,
                Some(Command::Quit) => break,
                Some(Command::Refresh) => {
                    if !start_fetch(&mut gate, &sources, &fetch_tx) {
                        session.record_skipped_refresh();
                        info!("refresh already running");
                    }
                }
                Some(command) => apply_command(session, command, Instant::now()),
            },
            _ = sleep_until(dashboard_due.unwrap_or_else(far_future)), if dashboard_due.is_some() => {
                session.poll_dashboard(Instant::now());
            }
            _ = tokio::task::yield_now(), if markers_pending => {
                session.create_marker_batch(Instant::now());
            }
        }
    }

    session.flush_dashboard();
}

pub fn apply_command<M: MapSurface, D: DashboardSurface>(
    session: &mut Session<M, D>,
    command: Command,
    now: Instant,
) {
    match command {
        Command::ToggleCategory(category) => {
            let on = session.toggle_category(category, now);
            info!(%category, on, "category toggled");
        }
        Command::Search(text) => session.set_search(&text, now),
        Command::Layer(level) => session.activate_layer(level),
        Command::SelectArea { level, name } => {
            if session.select_area_named(level, &name, now).is_none() {
                warn!(layer = %level, area = %name, "no such area on layer");
            }
        }
        Command::ClearArea => session.clear_area(now),
        Command::Click(id) => {
            if session.click_project(&id).is_none() {
                warn!(project = %id, "project has no marker");
            }
        }
        Command::Status => info!(
            projects = session.repository().len(),
            visible = session.visible().markers.len(),
            counted = session.visible().counted.len(),
            pending = session.pending_markers(),
            metrics = %session.metrics(),
            "status"
        ),
        Command::Refresh | Command::Quit => {}
    }
}

fn start_fetch(
    gate: &mut RefreshGate,
    sources: &FeedSources,
    tx: &mpsc::Sender<Vec<FeedFetch>>,
) -> bool {
    if !gate.try_begin(Instant::now()) {
        return false;
    }
    let sources = Arc::clone(sources);
    let tx = tx.clone();
    tokio::spawn(async move {
        let fetched = fetch_all(&sources).await;
        let _ = tx.send(fetched).await;
    });
    true
}

fn far_future() -> tokio::time::Instant {
    tokio::time::Instant::now() + Duration::from_secs(86_400)
}

#[cfg(test)]
mod tests {
    use super::{run, Command, RunOptions};
    use crate::session::{Session, SessionOptions};
    use catalog::loader::{FeedSource, StaticFeedSource};
    use catalog::project::{AdminLevel, Category, FeedIdentity};
    use compute::dashboard::RecordingDashboard;
    use foundation::ids::ProjectId;
    use scene::surface::RecordingSurface;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("toggle Tower"),
            Ok(Command::ToggleCategory(Category::Tower))
        );
        assert_eq!(
            Command::parse("  area district  Kota Kinabalu "),
            Ok(Command::SelectArea {
                level: AdminLevel::District,
                name: "Kota Kinabalu".to_string()
            })
        );
        assert_eq!(Command::parse("search"), Ok(Command::Search(String::new())));
        assert_eq!(
            Command::parse("click tower_3"),
            Ok(Command::Click(ProjectId::new("tower_3")))
        );
        assert_eq!(Command::parse("layer parliament"), Ok(Command::Layer(AdminLevel::Parliament)));
        assert!(Command::parse("toggle lamp").is_err());
        assert!(Command::parse("area dun").is_err());
        assert!(Command::parse("click").is_err());
        assert!(Command::parse("dance").is_err());
    }

    #[tokio::test]
    async fn loop_loads_feeds_and_layers_then_quits() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("district.json"),
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{"NAME":"Tawau"},
                "geometry":{"type":"Polygon","coordinates":[[[117.8,4.1],[118.1,4.1],[118.1,4.4],[117.8,4.1]]]}}]}"#,
        )
        .await
        .unwrap();

        let body = r#"setResponse({"table":{"cols":[{"label":"SITE"},{"label":"DAERAH"},{"label":"LAT"},{"label":"LON"}],
            "rows":[{"c":[{"v":"T1"},{"v":"Tawau"},{"v":"4.25"},{"v":"117,89"}]},{"c":[{"v":"T2"},{"v":"Kudat"},{"v":6.9},{"v":116.8}]}]}});"#;
        let sources: Vec<Arc<dyn FeedSource>> = vec![
            Arc::new(StaticFeedSource::new(FeedIdentity::new("tower", Category::Tower), body)),
            Arc::new(StaticFeedSource::failing(FeedIdentity::new("db_pim", Category::Nadi), "offline")),
        ];

        let options = SessionOptions {
            debounce: Duration::from_millis(10),
            ..SessionOptions::default()
        };
        let mut session = Session::new(options, RecordingSurface::new(), RecordingDashboard::default());
        let run_options = RunOptions {
            refresh_interval: Duration::from_secs(3600),
            boundary_dir: dir.path().to_path_buf(),
            initial_layer: AdminLevel::District,
        };

        let (tx, rx) = mpsc::channel(8);
        let driver = async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.send(Command::SelectArea {
                level: AdminLevel::District,
                name: "tawau".to_string(),
            })
            .await
            .unwrap();
            tx.send(Command::Quit).await.unwrap();
        };
        tokio::join!(run(&mut session, Arc::new(sources), run_options, rx), driver);

        assert_eq!(session.repository().len(), 2);
        assert_eq!(session.pending_markers(), 0);
        assert_eq!(session.map().visible_layers(), vec!["district"]);
        assert_eq!(session.visible().markers.len(), 1);
        assert_eq!(session.panel().selected_area.as_deref(), Some("Tawau"));
        assert_eq!(session.panel().total, Some(1));
    }
}
