// Runtime: chart instances, event dispatch and the output loops

use crate::charts::{
    Bubble, Chart, Choropleth, ConnectedScatter, DualAxis, EnergyMix, FlowsAccess,
};
use crate::config::VizConfig;
use crate::controller::{Control, Phase, Selection, TimerToken};
use crate::data::Dataset;
use crate::geo::{BoundarySet, NameFixes};
use crate::parser::{Event, ScriptLine};
use crate::reconcile::Stage;
use crate::render;
use crate::scene::{Scene, Tooltip};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub use crate::charts::ChartKind;

/// Load the inputs of one chart and build its pipeline
pub fn load_chart(kind: ChartKind, config: &VizConfig) -> Result<Box<dyn Chart>> {
    let dataset = Dataset::load(&config.data, kind.fields())
        .with_context(|| format!("Failed to load dataset for {}", kind))?;
    info!(chart = %kind, rows = dataset.len(), "dataset loaded");

    let chart: Box<dyn Chart> = match kind {
        ChartKind::ConnectedScatter => Box::new(ConnectedScatter::new(&dataset, config)?),
        ChartKind::Bubble => Box::new(Bubble::new(dataset)),
        ChartKind::EnergyMix => Box::new(EnergyMix::new(dataset, config.resource_groups.clone())),
        ChartKind::DualAxis => Box::new(DualAxis::new(dataset, &config.default_country)),
        ChartKind::FlowsAccess => Box::new(FlowsAccess::new(dataset)),
        ChartKind::Choropleth => {
            let boundaries = BoundarySet::load(&config.boundaries)
                .with_context(|| format!("Failed to load boundaries for {}", kind))?;
            Box::new(Choropleth::new(
                dataset,
                boundaries,
                NameFixes::new(config.name_fixes.clone()),
                config.default_year,
            ))
        }
    };
    Ok(chart)
}

/// One running chart: its pipeline, controls and on-screen elements
pub struct ChartInstance {
    chart: Box<dyn Chart>,
    control: Control,
    stage: Stage,
    phase: Phase,
    selection: Selection,
    size: (u32, u32),
}

impl ChartInstance {
    pub fn new(chart: Box<dyn Chart>) -> Self {
        let control = chart.control();
        Self {
            chart,
            control,
            stage: Stage::new(),
            phase: Phase::Idle,
            selection: Selection::default(),
            size: (0, 0),
        }
    }

    pub fn load(kind: ChartKind, config: &VizConfig) -> Result<Self> {
        Ok(Self::new(load_chart(kind, config)?))
    }

    pub fn kind(&self) -> ChartKind {
        self.chart.kind()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn control(&self) -> &Control {
        &self.control
    }

    /// Draw the initial selection. Idle → Rendered; a no-op afterwards.
    pub fn start(&mut self) -> Result<()> {
        if self.phase == Phase::Rendered {
            return Ok(());
        }
        let selection = self.control.selection();
        self.redraw(selection)?;
        if let Control::Animation(animation) = &mut self.control {
            animation.arm();
        }
        self.phase = Phase::Rendered;
        info!(chart = %self.kind(), "chart rendered");
        Ok(())
    }

    fn redraw(&mut self, selection: Selection) -> Result<()> {
        let scene = self
            .chart
            .render(&selection)
            .with_context(|| format!("Failed to render {}", self.kind()))?;
        self.size = (scene.width, scene.height);
        let plan = self.stage.apply(scene.elements, self.chart.timing());
        debug!(
            chart = %self.kind(),
            enter = plan.enter.len(),
            update = plan.update.len(),
            exit = plan.exit.len(),
            "reconciled"
        );
        self.selection = selection;
        Ok(())
    }

    /// Apply one event; returns whether the chart was redrawn. `Tick` fires
    /// the pending timer once regardless of its count. Hovers never redraw.
    pub fn dispatch(&mut self, event: &Event) -> Result<bool> {
        if self.phase == Phase::Idle {
            bail!("{} has not been started", self.kind());
        }
        if let Event::Hover(_) = event {
            return Ok(false);
        }
        match self.control.handle(event) {
            Some(selection) => {
                self.redraw(selection)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The timer token the play loop should wait on, if playing
    pub fn pending_timer(&self) -> Option<TimerToken> {
        match &self.control {
            Control::Animation(animation) => animation.pending(),
            _ => None,
        }
    }

    /// Deliver a timer firing. Stale tokens are ignored.
    pub fn fire(&mut self, token: TimerToken) -> Result<bool> {
        let fired = match &mut self.control {
            Control::Animation(animation) => animation.fire(token),
            _ => false,
        };
        if fired {
            let selection = self.control.selection();
            self.redraw(selection)?;
        }
        Ok(fired)
    }

    /// Drive the controls to show `countries` and/or `year`
    pub fn select(&mut self, countries: &[String], year: Option<i32>) -> Result<()> {
        let mut events = Vec::new();
        match &self.control {
            Control::Series(picker) if !countries.is_empty() => {
                if picker.count() != countries.len() {
                    events.push(Event::Count(countries.len()));
                }
                events.extend(countries.iter().enumerate().map(|(i, c)| Event::Pick {
                    slot: i + 1,
                    country: c.clone(),
                }));
            }
            Control::Country(_) => events.extend(countries.first().cloned().map(Event::Country)),
            Control::Year(_) => events.extend(year.map(Event::Year)),
            Control::Animation(_) => events.extend(year.map(Event::Slide)),
            _ => {}
        }
        for event in &events {
            if !self.dispatch(event)? {
                warn!(chart = %self.kind(), ?event, "selection not applied");
            }
        }
        Ok(())
    }

    /// Tooltip of a rendered element
    pub fn hover(&self, id: &str) -> Option<&Tooltip> {
        self.stage.hover(id)
    }

    /// Complete running transitions and drop exited elements
    pub fn settle(&mut self) {
        self.stage.settle();
    }

    /// Every element at its transition target
    pub fn scene(&self) -> Scene {
        self.stage.snapshot(self.size.0, self.size.1)
    }

    /// The picture `elapsed_ms` into the running transitions
    pub fn frame(&self, elapsed_ms: u64) -> Scene {
        self.stage.frame(self.size.0, self.size.1, elapsed_ms)
    }
}

/// Output file of a chart: `<dir>/<chart>.<ext>`, or numbered frames
pub fn output_path(dir: &Path, kind: ChartKind, frame: Option<usize>, ext: &str) -> PathBuf {
    match frame {
        Some(i) => dir.join(format!("{}-{:03}.{}", kind, i, ext)),
        None => dir.join(format!("{}.{}", kind, ext)),
    }
}

/// Load one chart, draw its initial selection and write it into `out_dir`
pub fn render_chart(kind: ChartKind, config: &VizConfig, out_dir: &Path) -> Result<PathBuf> {
    let mut instance = ChartInstance::load(kind, config)?;
    instance.start()?;
    let path = output_path(out_dir, kind, None, config.render.format.extension());
    render::write_scene(&instance.scene(), &path, &config.render)?;
    Ok(path)
}

/// Load and render every chart into `out_dir`. Each chart fails on its own;
/// the others still render.
pub fn render_all(config: &VizConfig, out_dir: &Path) -> Vec<(ChartKind, Result<PathBuf>)> {
    ChartKind::ALL
        .iter()
        .map(|&kind| {
            let result = render_chart(kind, config, out_dir);
            match &result {
                Ok(path) => info!(chart = %kind, path = %path.display(), "written"),
                Err(e) => {
                    let reason = format!("{:#}", e);
                    warn!(chart = %kind, error = %reason, "chart skipped");
                }
            }
            (kind, result)
        })
        .collect()
}

/// Run the animation timer in real time for up to `ticks` firings, handing
/// each frame to `on_frame` (frame 0 is the initial state). Stops early once
/// the animation is paused.
pub fn play(
    instance: &mut ChartInstance,
    ticks: usize,
    interval: Duration,
    mut on_frame: impl FnMut(usize, &Scene) -> Result<()>,
) -> Result<usize> {
    if !matches!(instance.control(), Control::Animation(_)) {
        bail!("{} has no animation timer", instance.kind());
    }
    instance.start()?;
    on_frame(0, &instance.scene())?;

    let mut fired = 0;
    while fired < ticks {
        let Some(token) = instance.pending_timer() else {
            info!("animation paused");
            break;
        };
        thread::sleep(interval);
        if !instance.fire(token)? {
            break;
        }
        fired += 1;
        debug!(tick = fired, year = ?instance.selection().year, "timer fired");
        on_frame(fired, &instance.scene())?;
    }
    Ok(fired)
}

/// Replay a parsed event script. Every redraw is handed to `on_frame`
/// (numbered from 1, frame 0 being the initial state); hovers go to
/// `on_hover`. `tick N` counts as N separate firings. Each step's
/// transitions complete before the next event.
pub fn run_session(
    instance: &mut ChartInstance,
    script: &[ScriptLine],
    mut on_frame: impl FnMut(usize, &Scene) -> Result<()>,
    mut on_hover: impl FnMut(&str, Option<&Tooltip>) -> Result<()>,
) -> Result<usize> {
    instance.start()?;
    on_frame(0, &instance.scene())?;
    instance.settle();

    let mut frames = 0;
    for line in script {
        match &line.event {
            Event::Hover(id) => on_hover(id, instance.hover(id))?,
            Event::Tick(n) => {
                for _ in 0..*n {
                    if instance.dispatch(&Event::Tick(1))? {
                        frames += 1;
                        on_frame(frames, &instance.scene())?;
                        instance.settle();
                    }
                }
            }
            event => {
                let redrawn = instance
                    .dispatch(event)
                    .with_context(|| format!("line {}", line.line))?;
                if redrawn {
                    frames += 1;
                    on_frame(frames, &instance.scene())?;
                    instance.settle();
                } else {
                    debug!(line = line.line, "no state change");
                }
            }
        }
    }
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::charts::fixtures::dataset;
    use crate::controller::{Animation, PlayState};
    use crate::data::Field;
    use crate::parser::parse_script;

    fn bubble_instance() -> ChartInstance {
        let r = |year: f64, access: f64, co2: f64| {
            vec![(Field::Year, year), (Field::ElectricityAccess, access), (Field::Co2Emissions, co2)]
        };
        let rows = [
            ("India", r(2000.0, 60.0, 1000.0)),
            ("India", r(2001.0, 62.0, 1100.0)),
            ("India", r(2002.0, 64.0, 1200.0)),
            ("Kenya", r(2000.0, 20.0, 10.0)),
            ("Nepal", r(2002.0, 50.0, 100.0)),
        ];
        let rows: Vec<(&str, &[(Field, f64)])> =
            rows.iter().map(|(e, v)| (*e, v.as_slice())).collect();
        ChartInstance::new(Box::new(Bubble::new(dataset(&rows))))
    }

    fn animation(instance: &ChartInstance) -> &Animation {
        match instance.control() {
            Control::Animation(a) => a,
            other => panic!("unexpected control {:?}", other),
        }
    }

    #[test]
    fn test_start_moves_idle_to_rendered() {
        let mut instance = bubble_instance();
        assert_eq!(instance.phase(), Phase::Idle);
        assert!(instance.dispatch(&Event::Tick(1)).is_err());
        instance.start().unwrap();
        assert_eq!(instance.phase(), Phase::Rendered);
        assert_eq!(instance.selection().year, Some(2000));
        assert!(instance.pending_timer().is_some());
    }

    #[test]
    fn test_ticks_reconcile_bubbles() {
        let mut instance = bubble_instance();
        instance.start().unwrap();
        let ids = |s: &Scene| -> Vec<String> {
            s.ids().filter(|id| id.starts_with("bubble:")).map(String::from).collect()
        };
        assert_eq!(ids(&instance.scene()), vec!["bubble:India", "bubble:Kenya"]);

        assert!(instance.dispatch(&Event::Tick(1)).unwrap());
        assert_eq!(ids(&instance.scene()), vec!["bubble:India"]);
        // Kenya is still shrinking mid-transition
        assert!(instance.frame(150).get("bubble:Kenya").is_some());
        assert!(instance.frame(300).get("bubble:Kenya").is_none());

        assert!(instance.dispatch(&Event::Tick(1)).unwrap());
        assert_eq!(ids(&instance.scene()), vec!["bubble:India", "bubble:Nepal"]);
        assert!(instance.dispatch(&Event::Tick(1)).unwrap());
        assert_eq!(instance.selection().year, Some(2000));
    }

    #[test]
    fn test_slide_stops_the_play_loop() {
        let mut instance = bubble_instance();
        instance.start().unwrap();
        let stale = instance.pending_timer().unwrap();
        assert!(instance.dispatch(&Event::Slide(2002)).unwrap());
        assert_eq!(animation(&instance).state(), PlayState::Paused);
        assert!(!instance.fire(stale).unwrap());

        let fired = play(&mut instance, 5, Duration::ZERO, |_, _| Ok(())).unwrap();
        assert_eq!(fired, 0);
        assert_eq!(instance.selection().year, Some(2002));
    }

    #[test]
    fn test_play_wraps_years() {
        let mut instance = bubble_instance();
        let mut years = Vec::new();
        let fired = play(&mut instance, 3, Duration::ZERO, |_, scene| {
            let label = scene.get("year-label").map(|e| e.shape.clone());
            if let Some(crate::scene::Shape::Text { content, .. }) = label {
                years.push(content);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(fired, 3);
        assert_eq!(years, vec!["2000", "2001", "2002", "2000"]);
    }

    #[test]
    fn test_session_frames_and_hovers() {
        let mut instance = bubble_instance();
        let script = parse_script("tick 2\nhover \"bubble:Nepal\"\nslide 2000\ntick\n").unwrap();
        let mut frames = Vec::new();
        let mut hovers = Vec::new();
        let count = run_session(
            &mut instance,
            &script,
            |i, _| {
                frames.push(i);
                Ok(())
            },
            |id, tip| {
                hovers.push((id.to_string(), tip.map(|t| t.title.clone())));
                Ok(())
            },
        )
        .unwrap();
        // initial + two ticks + slide; the tick after the slide is ignored
        assert_eq!(count, 3);
        assert_eq!(frames, vec![0, 1, 2, 3]);
        assert_eq!(hovers, vec![("bubble:Nepal".to_string(), Some("Nepal".to_string()))]);
    }

    #[test]
    fn test_session_steps_settle_transitions() {
        let mut instance = bubble_instance();
        let script = parse_script("tick\n").unwrap();
        run_session(&mut instance, &script, |_, _| Ok(()), |_, _| Ok(())).unwrap();
        // Kenya left in 2001; no shrinking remnant is carried into later frames
        let frame = instance.frame(0);
        assert!(frame.get("bubble:Kenya").is_none());
        assert!(matches!(
            frame.get("bubble:India").map(|e| &e.shape),
            Some(crate::scene::Shape::Circle { r, .. }) if *r > 0.0
        ));
    }

    #[test]
    fn test_output_path() {
        let dir = Path::new("out");
        assert_eq!(
            output_path(dir, ChartKind::Bubble, Some(7), "svg"),
            PathBuf::from("out/bubble-007.svg")
        );
        assert_eq!(
            output_path(dir, ChartKind::DualAxis, None, "png"),
            PathBuf::from("out/dual-axis.png")
        );
    }
}
