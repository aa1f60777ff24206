use kurbo::Size;

use crate::{
    color::EMPTY_SEGMENT_FILL,
    config::Configuration,
    error::ChartResult,
    export::{self, ExportedImage},
    person::{PersonId, PersonNode, validate_dataset},
    reconcile::{NodeState, ReconcilePlan},
    scene::{LabelMark, RingRole, Scene, build_scene},
    source::DataSource,
    svg,
    transition::{
        BatchStatus, Completion, FinalizePlan, TransitionCoordinator, Tween, TweenProp,
        TweenTarget,
    },
    viewport::{self, Viewport},
};

/// What a click on a segment resolves to. Navigation itself belongs to the
/// embedder; the chart only routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Placeholder or otherwise unavailable segment; nothing happens.
    Ignored,
    /// Root segment: leave the chart for this person's page.
    Navigate(String),
    /// Non-root segment: an update cycle toward this person has started.
    UpdateStarted,
}

/// Composition root: owns the scene, the data source and the one update
/// cycle allowed in flight at a time.
pub struct Chart<S: DataSource> {
    config: Configuration,
    source: S,
    scene: Scene,
    coordinator: TransitionCoordinator,
}

impl<S: DataSource> Chart<S> {
    pub fn new(config: Configuration, source: S) -> ChartResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            source,
            scene: Scene::default(),
            coordinator: TransitionCoordinator::new(),
        })
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn is_animating(&self) -> bool {
        self.coordinator.is_running()
    }

    fn container(&self) -> Size {
        Size::new(self.config.container_width, self.config.container_height)
    }

    /// Replace the scene wholesale with a settled rendering of `dataset`.
    #[tracing::instrument(skip(self, dataset), fields(nodes = dataset.len()))]
    pub fn draw(&mut self, dataset: Vec<PersonNode>) -> ChartResult<()> {
        validate_dataset(&dataset, self.config.generations)?;
        // Settle any batch still in flight; its completion fires here.
        self.coordinator.interrupt(&mut self.scene)?;

        self.scene = build_scene(&self.config, &dataset);
        if self.config.hide_empty_segments {
            self.scene.segments.retain(|s| !s.is_placeholder());
        }
        Ok(())
    }

    /// Fetch a new dataset and animate the scene toward it. The completion
    /// callback fires exactly once, after every animation of this cycle has
    /// ended. A failed fetch returns before anything is touched.
    #[tracing::instrument(skip(self, on_complete))]
    pub fn update(
        &mut self,
        url: &str,
        on_complete: impl FnOnce() + 'static,
    ) -> ChartResult<()> {
        let dataset = self.source.fetch(url)?;
        validate_dataset(&dataset, self.config.generations)?;

        // Interrupt only now that the dataset is in hand: the old batch
        // settles deterministically and the previous state read below is the
        // resting one.
        self.coordinator.interrupt(&mut self.scene)?;

        let previous = self.scene.previous_state();
        let plan = ReconcilePlan::build(&previous, &dataset);
        let old_scene = std::mem::take(&mut self.scene);

        let mut next = build_scene(&self.config, &dataset);
        let duration = f64::from(self.config.update_duration);
        let mut tweens = Vec::new();
        let mut finalize = FinalizePlan::default();

        // Apply the classification to every incoming segment and stage its
        // animation start values before any tween can run.
        let mut staged = Vec::with_capacity(next.segments.len());
        for mut segment in next.segments.drain(..) {
            let state = plan.states[&segment.id];
            let old = old_scene.segment(segment.id);
            segment.state = Some(state);

            for label in &mut segment.labels {
                label.mark = LabelMark::Incoming;
                label.opacity = 0.0;
            }
            let has_incoming = !segment.labels.is_empty();
            if let Some(old) = old {
                let mut carried = old.labels.clone();
                for label in &mut carried {
                    label.mark = LabelMark::Outgoing;
                }
                segment.labels.splice(0..0, carried);
            }
            let has_outgoing = segment.labels.iter().any(|l| l.mark == LabelMark::Outgoing);

            // The builder assigned this cycle's target fill; animations start
            // from whatever the slot showed before.
            let assigned = segment.fill;
            match state {
                NodeState::New => {
                    segment.opacity = 0.0;
                    if let Some(old) = old {
                        segment.fill = old.fill;
                    }
                    tweens.push(Tween::new(
                        TweenTarget::Wedge(segment.id),
                        TweenProp::Opacity { to: 1.0 },
                        duration,
                    ));
                    if segment.fill != assigned {
                        tweens.push(Tween::new(
                            TweenTarget::Wedge(segment.id),
                            TweenProp::Fill { to: assigned },
                            duration,
                        ));
                    }
                }
                NodeState::Update => {
                    if let Some(old) = old {
                        segment.fill = old.fill;
                        segment.opacity = old.opacity;
                    }
                    tweens.push(Tween::new(
                        TweenTarget::Wedge(segment.id),
                        TweenProp::Fill { to: assigned },
                        duration,
                    ));
                    if segment.opacity != 1.0 {
                        tweens.push(Tween::new(
                            TweenTarget::Wedge(segment.id),
                            TweenProp::Opacity { to: 1.0 },
                            duration,
                        ));
                    }
                }
                NodeState::Remove => {
                    segment.available = false;
                    if let Some(old) = old {
                        segment.fill = old.fill;
                        segment.opacity = old.opacity;
                    }
                    if self.config.hide_empty_segments {
                        if old.is_none() {
                            // Fresh placeholder that would only fade out;
                            // never show it at all.
                            continue;
                        }
                        finalize.remove_segments.push(segment.id);
                        tweens.push(Tween::new(
                            TweenTarget::Wedge(segment.id),
                            TweenProp::Opacity { to: 0.0 },
                            duration,
                        ));
                    } else if segment.fill != EMPTY_SEGMENT_FILL {
                        tweens.push(Tween::new(
                            TweenTarget::Wedge(segment.id),
                            TweenProp::Fill {
                                to: EMPTY_SEGMENT_FILL,
                            },
                            duration,
                        ));
                    }
                }
                NodeState::Available => unreachable!("classification never yields Available"),
            }

            if has_outgoing {
                tweens.push(Tween::new(
                    TweenTarget::Labels(segment.id, LabelMark::Outgoing),
                    TweenProp::Opacity { to: 0.0 },
                    duration,
                ));
            }
            if has_incoming {
                tweens.push(Tween::new(
                    TweenTarget::Labels(segment.id, LabelMark::Incoming),
                    TweenProp::Opacity { to: 1.0 },
                    duration,
                ));
            }

            staged.push(segment);
        }

        // Segments that vanished from the dataset stay on screen long enough
        // to fade out, then leave at finalization.
        for id in &plan.departed {
            let Some(old) = old_scene.segment(*id) else {
                continue;
            };
            let mut segment = old.clone();
            segment.state = Some(NodeState::Remove);
            segment.available = false;
            for label in &mut segment.labels {
                label.mark = LabelMark::Outgoing;
            }
            tweens.push(Tween::new(
                TweenTarget::Wedge(segment.id),
                TweenProp::Opacity { to: 0.0 },
                duration,
            ));
            if !segment.labels.is_empty() {
                tweens.push(Tween::new(
                    TweenTarget::Labels(segment.id, LabelMark::Outgoing),
                    TweenProp::Opacity { to: 0.0 },
                    duration,
                ));
            }
            finalize.remove_segments.push(segment.id);
            staged.push(segment);
        }

        let mut ring = Vec::new();
        if self.config.show_color_gradients {
            let had_ring = !old_scene.ring.is_empty();
            ring.extend(old_scene.ring.iter().cloned());
            for mut slice in next.ring.drain(..) {
                slice.role = RingRole::Incoming;
                slice.opacity = 0.0;
                ring.push(slice);
            }
            if had_ring {
                tweens.push(Tween::new(
                    TweenTarget::Ring(RingRole::Current),
                    TweenProp::Opacity { to: 0.0 },
                    duration,
                ));
            }
            if ring.iter().any(|s| s.role == RingRole::Incoming) {
                tweens.push(Tween::new(
                    TweenTarget::Ring(RingRole::Incoming),
                    TweenProp::Opacity { to: 1.0 },
                    duration,
                ));
            }
            finalize.promote_ring = true;
        }

        self.scene = Scene {
            segments: staged,
            ring,
        };

        self.coordinator.start_batch(
            &mut self.scene,
            tweens,
            finalize,
            Completion::new(Some(Box::new(on_complete))),
        )?;
        Ok(())
    }

    /// Advance the in-flight animation batch by `dt_ms` of wall time.
    pub fn advance(&mut self, dt_ms: f64) -> ChartResult<BatchStatus> {
        self.coordinator.advance(&mut self.scene, dt_ms)
    }

    /// Route a click on segment `id`. Root segments navigate away, everything
    /// else with a real person behind it starts one update cycle.
    pub fn click(
        &mut self,
        id: PersonId,
        on_complete: impl FnOnce() + 'static,
    ) -> ChartResult<ClickOutcome> {
        let Some(segment) = self.scene.segment(id) else {
            return Ok(ClickOutcome::Ignored);
        };
        if segment.is_placeholder() || !segment.available {
            return Ok(ClickOutcome::Ignored);
        }
        if segment.depth == 0 {
            return Ok(ClickOutcome::Navigate(segment.url.clone()));
        }

        let url = segment.update_url.clone();
        self.update(&url, on_complete)?;
        Ok(ClickOutcome::UpdateStarted)
    }

    /// Viewport framing the current content, recomputed on every call.
    pub fn viewport(&self) -> ChartResult<Viewport> {
        let content = self.scene.content_bounds().unwrap_or(kurbo::Rect::ZERO);
        viewport::compute_viewport(
            content,
            self.container(),
            viewport::MIN_HEIGHT,
            viewport::MIN_PADDING,
        )
    }

    /// Serialize the current scene as a standalone SVG document.
    pub fn svg(&self) -> ChartResult<String> {
        Ok(svg::document(&self.scene, &self.viewport()?))
    }

    /// Rasterize the current scene with the live framing.
    pub fn export(&self) -> ChartResult<ExportedImage> {
        export::export(&self.scene, self.container())
    }

    pub fn export_to_file(
        &self,
        dir: &std::path::Path,
        filename: Option<&str>,
    ) -> ChartResult<std::path::PathBuf> {
        export::export_to_file(&self.scene, self.container(), dir, filename)
    }

    pub fn is_empty(&self) -> bool {
        self.scene.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::{error::ChartError, source::StaticDataSource};

    fn node(id: u64, depth: u32, xref: &str, name: &str) -> PersonNode {
        PersonNode {
            id: PersonId(id),
            xref: xref.to_string(),
            depth,
            url: format!("/individual/{id}"),
            update_url: format!("/update/{id}"),
            name: name.to_string(),
            timespan: String::new(),
        }
    }

    fn first_dataset() -> Vec<PersonNode> {
        vec![
            node(1, 0, "I1", "Root"),
            node(2, 1, "I2", "Father"),
            node(3, 1, "", ""),
        ]
    }

    fn second_dataset() -> Vec<PersonNode> {
        vec![
            node(2, 0, "I2", "Father"),
            node(4, 1, "I4", "Grandfather"),
            node(5, 1, "I5", "Grandmother"),
        ]
    }

    fn chart_with_updates() -> Chart<StaticDataSource> {
        let mut source = StaticDataSource::new();
        source.insert("/update/2", second_dataset());
        let mut chart = Chart::new(Configuration::default(), source).unwrap();
        chart.draw(first_dataset()).unwrap();
        chart
    }

    fn run_to_idle(chart: &mut Chart<StaticDataSource>) {
        for _ in 0..200 {
            if chart.advance(16.0).unwrap() == BatchStatus::Idle {
                return;
            }
        }
        panic!("batch never settled");
    }

    #[test]
    fn draw_marks_real_people_available() {
        let chart = chart_with_updates();
        assert!(chart.scene().segment(PersonId(1)).unwrap().available);
        assert!(!chart.scene().segment(PersonId(3)).unwrap().available);
    }

    #[test]
    fn update_classifies_before_any_animation_runs() {
        let mut chart = chart_with_updates();
        chart.update("/update/2", || {}).unwrap();

        // Classification is on the scene, no tween has ticked yet.
        let seg2 = chart.scene().segment(PersonId(2)).unwrap();
        assert_eq!(seg2.state, Some(NodeState::Update));
        let seg4 = chart.scene().segment(PersonId(4)).unwrap();
        assert_eq!(seg4.state, Some(NodeState::New));
        assert_eq!(seg4.opacity, 0.0);

        // Departed segments linger for their fade-out.
        assert!(chart.scene().segment(PersonId(1)).is_some());
        assert!(chart.is_animating());
    }

    #[test]
    fn update_settles_scene_and_fires_callback_once() {
        let mut chart = chart_with_updates();
        let calls = Rc::new(Cell::new(0u32));
        let calls2 = Rc::clone(&calls);
        chart
            .update("/update/2", move || calls2.set(calls2.get() + 1))
            .unwrap();
        run_to_idle(&mut chart);

        assert_eq!(calls.get(), 1);
        // Departed root and old placeholder are gone.
        assert!(chart.scene().segment(PersonId(1)).is_none());
        assert!(chart.scene().segment(PersonId(3)).is_none());
        // Everyone left is settled, clickable and unclassified.
        for segment in &chart.scene().segments {
            assert_eq!(segment.state, None);
            assert!(segment.available);
            assert_eq!(segment.opacity, 1.0);
            assert!(segment.labels.iter().all(|l| l.mark == LabelMark::Current));
        }

        // Idle ticks never re-fire the completion.
        chart.advance(16.0).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn failed_fetch_leaves_scene_untouched() {
        let mut chart = chart_with_updates();
        let before = chart.svg().unwrap();
        let calls = Rc::new(Cell::new(0u32));
        let calls2 = Rc::clone(&calls);

        let err = chart
            .update("/missing", move || calls2.set(calls2.get() + 1))
            .unwrap_err();
        assert!(matches!(err, ChartError::Data(_)));
        assert_eq!(calls.get(), 0);
        assert!(!chart.is_animating());
        assert_eq!(chart.svg().unwrap(), before);
    }

    #[test]
    fn click_routing_follows_depth_and_availability() {
        let mut chart = chart_with_updates();

        assert_eq!(
            chart.click(PersonId(1), || {}).unwrap(),
            ClickOutcome::Navigate("/individual/1".to_string())
        );
        assert_eq!(chart.click(PersonId(3), || {}).unwrap(), ClickOutcome::Ignored);
        assert_eq!(chart.click(PersonId(99), || {}).unwrap(), ClickOutcome::Ignored);

        let calls = Rc::new(Cell::new(0u32));
        let calls2 = Rc::clone(&calls);
        assert_eq!(
            chart
                .click(PersonId(2), move || calls2.set(calls2.get() + 1))
                .unwrap(),
            ClickOutcome::UpdateStarted
        );
        run_to_idle(&mut chart);
        assert_eq!(calls.get(), 1);
        // The clicked person is the new root now.
        assert_eq!(chart.scene().segment(PersonId(2)).unwrap().depth, 0);
    }

    #[test]
    fn second_update_interrupts_the_first_deterministically() {
        let mut source = StaticDataSource::new();
        source.insert("/update/2", second_dataset());
        source.insert("/back", first_dataset());
        let mut chart = Chart::new(Configuration::default(), source).unwrap();
        chart.draw(first_dataset()).unwrap();

        let first_calls = Rc::new(Cell::new(0u32));
        let c1 = Rc::clone(&first_calls);
        chart.update("/update/2", move || c1.set(c1.get() + 1)).unwrap();
        chart.advance(100.0).unwrap();
        assert_eq!(first_calls.get(), 0);

        let second_calls = Rc::new(Cell::new(0u32));
        let c2 = Rc::clone(&second_calls);
        chart.update("/back", move || c2.set(c2.get() + 1)).unwrap();
        // The first batch was finalized exactly once at the interrupt.
        assert_eq!(first_calls.get(), 1);

        run_to_idle(&mut chart);
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 1);
        assert!(chart.scene().segment(PersonId(1)).is_some());
    }

    #[test]
    fn hide_empty_segments_fades_and_removes_placeholders() {
        let mut config = Configuration::default();
        config.hide_empty_segments = true;
        let mut source = StaticDataSource::new();
        // Same root, but the father slot has gone unknown.
        source.insert(
            "/u",
            vec![node(1, 0, "I1", "Root"), node(2, 1, "", "")],
        );
        let mut chart = Chart::new(config, source).unwrap();
        chart.draw(first_dataset()).unwrap();
        // Placeholder 3 never rendered at all.
        assert!(chart.scene().segment(PersonId(3)).is_none());

        chart.update("/u", || {}).unwrap();
        // Slot 2 is still there, fading out.
        assert!(chart.scene().segment(PersonId(2)).is_some());
        run_to_idle(&mut chart);
        assert!(chart.scene().segment(PersonId(2)).is_none());
    }

    #[test]
    fn gradients_stage_an_incoming_ring_and_promote_it() {
        let mut config = Configuration::default();
        config.show_color_gradients = true;
        let mut source = StaticDataSource::new();
        source.insert("/update/2", second_dataset());
        let mut chart = Chart::new(config, source).unwrap();
        chart.draw(first_dataset()).unwrap();
        assert!(!chart.scene().ring.is_empty());

        chart.update("/update/2", || {}).unwrap();
        assert!(chart.scene().ring.iter().any(|s| s.role == RingRole::Incoming));
        run_to_idle(&mut chart);
        assert!(chart.scene().ring.iter().all(|s| s.role == RingRole::Current));
        assert!(chart.scene().ring.iter().all(|s| s.opacity == 1.0));
    }
}
