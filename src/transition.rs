use crate::{
    color::Rgba8,
    ease::Ease,
    error::{ChartError, ChartResult},
    person::PersonId,
    scene::{LabelMark, RingRole, Scene},
};

/// What one tween drives. `Labels` and `Ring` address a group of elements but
/// still register as a single animation with the batch counter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenTarget {
    Wedge(PersonId),
    Labels(PersonId, LabelMark),
    Ring(RingRole),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TweenProp {
    Opacity { to: f64 },
    Fill { to: Rgba8 },
}

/// One property animation inside a batch. `from` is captured from the live
/// scene when the tween starts, not when the batch is built.
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    pub target: TweenTarget,
    pub prop: TweenProp,
    pub ease: Ease,
    pub delay_ms: f64,
    pub duration_ms: f64,
}

impl Tween {
    pub fn new(target: TweenTarget, prop: TweenProp, duration_ms: f64) -> Self {
        Self {
            target,
            prop,
            ease: Ease::InOutCubic,
            delay_ms: 0.0,
            duration_ms,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Captured {
    Opacity(f64),
    Fill(Rgba8),
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Pending,
    Active { from: Captured },
    Done,
}

#[derive(Clone, Debug)]
struct TweenRun {
    tween: Tween,
    phase: Phase,
}

/// Scene mutations executed exactly once when a batch settles.
#[derive(Clone, Debug, Default)]
pub struct FinalizePlan {
    /// Segments leaving the scene: departed ids, plus faded-out placeholders
    /// under `hide_empty_segments`.
    pub remove_segments: Vec<PersonId>,
    /// Drop `Current`-role ring slices and promote `Incoming` ones.
    pub promote_ring: bool,
}

/// One-shot completion signal owned by the batch; resolving twice is an
/// invariant violation.
pub struct Completion {
    callback: Option<Box<dyn FnOnce()>>,
    resolved: bool,
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("pending", &self.callback.is_some())
            .field("resolved", &self.resolved)
            .finish()
    }
}

impl Completion {
    pub fn new(callback: Option<Box<dyn FnOnce()>>) -> Self {
        Self {
            callback,
            resolved: false,
        }
    }

    fn resolve(&mut self) -> ChartResult<()> {
        if self.resolved {
            return Err(ChartError::invariant("completion resolved twice"));
        }
        self.resolved = true;
        if let Some(callback) = self.callback.take() {
            callback();
        }
        Ok(())
    }
}

/// All animations of one update cycle plus the join counter over their
/// start/end events. Counts are fields of this object, so a later batch can
/// never observe residue from an earlier one.
#[derive(Debug)]
pub struct TransitionBatch {
    active: u32,
    finalized: bool,
    elapsed_ms: f64,
    runs: Vec<TweenRun>,
    plan: FinalizePlan,
    completion: Completion,
}

impl TransitionBatch {
    pub fn new(tweens: Vec<Tween>, plan: FinalizePlan, completion: Completion) -> Self {
        Self {
            active: 0,
            finalized: false,
            elapsed_ms: 0.0,
            runs: tweens
                .into_iter()
                .map(|tween| TweenRun {
                    tween,
                    phase: Phase::Pending,
                })
                .collect(),
            plan,
            completion,
        }
    }

    pub fn active_count(&self) -> u32 {
        self.active
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Register one animation-start event.
    pub fn on_animation_start(&mut self) -> ChartResult<()> {
        if self.finalized {
            return Err(ChartError::invariant(
                "animation started after batch finalization",
            ));
        }
        self.active += 1;
        Ok(())
    }

    /// Register one animation-end event. Returns true exactly when this event
    /// takes the active count from 1 to 0, the one moment the batch may
    /// finalize.
    pub fn on_animation_end(&mut self) -> ChartResult<bool> {
        if self.active == 0 {
            return Err(ChartError::invariant(
                "animation end without a matching start",
            ));
        }
        self.active -= 1;
        Ok(self.active == 0)
    }
}

/// Whether a batch is still running after an `advance` tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchStatus {
    Idle,
    Running,
}

enum CoordinatorState {
    Idle,
    Running(TransitionBatch),
}

/// Drives the per-cycle animation batch: `Idle -> Running -> Finalizing ->
/// Idle`. Time comes from the embedder through [`advance`]; finalization runs
/// exactly once, when the last started animation has ended.
///
/// [`advance`]: TransitionCoordinator::advance
pub struct TransitionCoordinator {
    state: CoordinatorState,
}

impl Default for TransitionCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionCoordinator {
    pub fn new() -> Self {
        Self {
            state: CoordinatorState::Idle,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, CoordinatorState::Running(_))
    }

    /// Begin a new batch. A batch still in flight is interrupted first:
    /// every unfinished tween snaps to its final value and emits its end
    /// event, so the old batch finalizes exactly once before the new one
    /// starts. An empty tween set finalizes immediately — waiting on a join
    /// counter that can never move would hang forever.
    pub fn start_batch(
        &mut self,
        scene: &mut Scene,
        tweens: Vec<Tween>,
        plan: FinalizePlan,
        completion: Completion,
    ) -> ChartResult<BatchStatus> {
        self.interrupt(scene)?;

        let batch = TransitionBatch::new(tweens, plan, completion);
        if batch.runs.is_empty() {
            tracing::debug!("empty transition batch, finalizing immediately");
            Self::finalize(scene, batch)?;
            return Ok(BatchStatus::Idle);
        }

        tracing::debug!(tweens = batch.runs.len(), "transition batch started");
        self.state = CoordinatorState::Running(batch);
        Ok(BatchStatus::Running)
    }

    /// Snap an in-flight batch to its settled end state and finalize it.
    /// Interrupted and never-started tweens still emit their start/end pair,
    /// keeping the counter symmetric.
    pub fn interrupt(&mut self, scene: &mut Scene) -> ChartResult<()> {
        let CoordinatorState::Running(mut batch) =
            std::mem::replace(&mut self.state, CoordinatorState::Idle)
        else {
            return Ok(());
        };

        tracing::debug!(active = batch.active, "interrupting transition batch");
        for i in 0..batch.runs.len() {
            match batch.runs[i].phase {
                Phase::Pending => {
                    batch.on_animation_start()?;
                    let tween = batch.runs[i].tween;
                    let from = capture(scene, &tween)?;
                    apply(scene, &tween, from, 1.0)?;
                    batch.runs[i].phase = Phase::Done;
                    batch.on_animation_end()?;
                }
                Phase::Active { from } => {
                    let tween = batch.runs[i].tween;
                    apply(scene, &tween, from, 1.0)?;
                    batch.runs[i].phase = Phase::Done;
                    batch.on_animation_end()?;
                }
                Phase::Done => {}
            }
        }

        Self::finalize(scene, batch)
    }

    /// Advance the in-flight batch by `dt_ms`. Start events for every tween
    /// whose window this tick enters are processed before any end event, so
    /// the count can only reach zero on the last end of the tick. A zero
    /// count alone is not enough to finalize: delayed tweens may not have
    /// started yet, and the batch must outlive them.
    pub fn advance(&mut self, scene: &mut Scene, dt_ms: f64) -> ChartResult<BatchStatus> {
        if !dt_ms.is_finite() || dt_ms < 0.0 {
            return Err(ChartError::validation("advance dt must be finite and >= 0"));
        }

        let CoordinatorState::Running(batch) = &mut self.state else {
            return Ok(BatchStatus::Idle);
        };

        batch.elapsed_ms += dt_ms;
        let now = batch.elapsed_ms;

        for i in 0..batch.runs.len() {
            if matches!(batch.runs[i].phase, Phase::Pending) && now >= batch.runs[i].tween.delay_ms
            {
                batch.on_animation_start()?;
                let from = capture(scene, &batch.runs[i].tween)?;
                batch.runs[i].phase = Phase::Active { from };
            }
        }

        let mut reached_zero = false;
        for i in 0..batch.runs.len() {
            let Phase::Active { from } = batch.runs[i].phase else {
                continue;
            };
            let tween = batch.runs[i].tween;
            let t = if tween.duration_ms <= 0.0 {
                1.0
            } else {
                ((now - tween.delay_ms) / tween.duration_ms).clamp(0.0, 1.0)
            };
            apply(scene, &tween, from, tween.ease.apply(t))?;
            if t >= 1.0 {
                batch.runs[i].phase = Phase::Done;
                reached_zero = batch.on_animation_end()?;
            }
        }

        let all_done = batch
            .runs
            .iter()
            .all(|r| matches!(r.phase, Phase::Done));
        if reached_zero && all_done {
            let CoordinatorState::Running(batch) =
                std::mem::replace(&mut self.state, CoordinatorState::Idle)
            else {
                unreachable!("batch was running above");
            };
            Self::finalize(scene, batch)?;
            return Ok(BatchStatus::Idle);
        }

        Ok(BatchStatus::Running)
    }

    /// The `Finalizing` step: execute the plan against the scene, resolve the
    /// completion signal, return to `Idle`. Runs at most once per batch.
    fn finalize(scene: &mut Scene, mut batch: TransitionBatch) -> ChartResult<()> {
        if batch.finalized {
            return Err(ChartError::invariant("transition batch finalized twice"));
        }
        if batch.active != 0 {
            return Err(ChartError::invariant(format!(
                "finalizing with {} animations still active",
                batch.active
            )));
        }
        batch.finalized = true;

        scene.remove_segments(&batch.plan.remove_segments);

        for segment in &mut scene.segments {
            segment.labels.retain(|l| l.mark != LabelMark::Outgoing);
            for label in &mut segment.labels {
                label.mark = LabelMark::Current;
            }
            segment.state = None;
            segment.available = !segment.is_placeholder();
        }

        if batch.plan.promote_ring {
            scene.ring.retain(|s| s.role != RingRole::Current);
            for slice in &mut scene.ring {
                slice.role = RingRole::Current;
            }
        }

        tracing::debug!("transition batch finalized");
        batch.completion.resolve()
    }
}

fn capture(scene: &Scene, tween: &Tween) -> ChartResult<Captured> {
    match (tween.target, tween.prop) {
        (TweenTarget::Wedge(id), TweenProp::Opacity { .. }) => {
            let segment = lookup(scene, id)?;
            Ok(Captured::Opacity(segment.opacity))
        }
        (TweenTarget::Wedge(id), TweenProp::Fill { .. }) => {
            let segment = lookup(scene, id)?;
            Ok(Captured::Fill(segment.fill))
        }
        (TweenTarget::Labels(id, mark), TweenProp::Opacity { .. }) => {
            let segment = lookup(scene, id)?;
            let opacity = segment
                .labels
                .iter()
                .find(|l| l.mark == mark)
                .map_or(1.0, |l| l.opacity);
            Ok(Captured::Opacity(opacity))
        }
        (TweenTarget::Ring(role), TweenProp::Opacity { .. }) => {
            let opacity = scene
                .ring
                .iter()
                .find(|s| s.role == role)
                .map_or(1.0, |s| s.opacity);
            Ok(Captured::Opacity(opacity))
        }
        (TweenTarget::Labels(..), TweenProp::Fill { .. })
        | (TweenTarget::Ring(_), TweenProp::Fill { .. }) => Err(ChartError::invariant(
            "fill tweens only apply to wedges",
        )),
    }
}

fn apply(scene: &mut Scene, tween: &Tween, from: Captured, eased: f64) -> ChartResult<()> {
    match (tween.target, tween.prop, from) {
        (TweenTarget::Wedge(id), TweenProp::Opacity { to }, Captured::Opacity(from)) => {
            lookup_mut(scene, id)?.opacity = from + (to - from) * eased;
        }
        (TweenTarget::Wedge(id), TweenProp::Fill { to }, Captured::Fill(from)) => {
            lookup_mut(scene, id)?.fill = Rgba8::lerp(from, to, eased);
        }
        (TweenTarget::Labels(id, mark), TweenProp::Opacity { to }, Captured::Opacity(from)) => {
            let segment = lookup_mut(scene, id)?;
            for label in segment.labels.iter_mut().filter(|l| l.mark == mark) {
                label.opacity = from + (to - from) * eased;
            }
        }
        (TweenTarget::Ring(role), TweenProp::Opacity { to }, Captured::Opacity(from)) => {
            for slice in scene.ring.iter_mut().filter(|s| s.role == role) {
                slice.opacity = from + (to - from) * eased;
            }
        }
        _ => {
            return Err(ChartError::invariant(
                "tween capture does not match its property",
            ));
        }
    }
    Ok(())
}

fn lookup(scene: &Scene, id: PersonId) -> ChartResult<&crate::scene::Segment> {
    scene
        .segment(id)
        .ok_or_else(|| ChartError::invariant(format!("tween targets missing segment {}", id.0)))
}

fn lookup_mut(scene: &mut Scene, id: PersonId) -> ChartResult<&mut crate::scene::Segment> {
    scene
        .segment_mut(id)
        .ok_or_else(|| ChartError::invariant(format!("tween targets missing segment {}", id.0)))
}
