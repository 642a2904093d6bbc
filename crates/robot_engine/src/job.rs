use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use robot_core::{
    Capabilities, Description, ErrorCode, JobError, JobEvent, JobId, JobState, KillVerbosity,
    Lifecycle, ProgressState, Unit,
};
use robot_logging::{robot_debug, robot_error, robot_trace};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Without a new speed report for this long, observers are told the speed
/// dropped to zero.
pub const SPEED_QUIET_PERIOD: Duration = Duration::from_secs(5);

static NEXT_JOB_ID: AtomicU64 = AtomicU64::new(1);

/// Receiver of job notifications.
///
/// Called synchronously from whichever thread produced the event, never
/// while the job's own state lock is held.
pub trait EventSink: Send + Sync {
    fn emit(&self, job_id: JobId, event: &JobEvent);
}

pub struct ChannelEventSink {
    tx: mpsc::Sender<(JobId, JobEvent)>,
}

impl ChannelEventSink {
    pub fn new(tx: mpsc::Sender<(JobId, JobEvent)>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, job_id: JobId, event: &JobEvent) {
        let _ = self.tx.send((job_id, event.clone()));
    }
}

struct FnSink<F>(F);

impl<F> EventSink for FnSink<F>
where
    F: Fn(&JobEvent) + Send + Sync,
{
    fn emit(&self, _job_id: JobId, event: &JobEvent) {
        (self.0)(event);
    }
}

struct JobInner {
    lifecycle: Lifecycle,
    progress: ProgressState,
    speed_timer: Option<JoinHandle<()>>,
    speed_generation: u64,
    disposed: bool,
}

struct Shared {
    id: JobId,
    inner: Mutex<JobInner>,
    sinks: Mutex<Vec<Arc<dyn EventSink>>>,
    done: watch::Sender<bool>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = inner.speed_timer.take() {
            timer.abort();
        }
        let Some(event) = inner.lifecycle.force_finish() else {
            return;
        };
        robot_debug!("job {} dropped before it finished", self.id);
        let sinks = self.sinks.get_mut().unwrap_or_else(PoisonError::into_inner);
        for sink in sinks.iter() {
            sink.emit(self.id, &event);
        }
        self.done.send_replace(true);
    }
}

/// Shared handle to the state every job carries.
///
/// Clones refer to the same job. When the last handle goes away before the
/// job finished, observers still receive `Finished`.
#[derive(Clone)]
pub struct BaseJob {
    shared: Arc<Shared>,
}

impl Default for BaseJob {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BaseJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaseJob")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl BaseJob {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                id: NEXT_JOB_ID.fetch_add(1, Ordering::Relaxed),
                inner: Mutex::new(JobInner {
                    lifecycle: Lifecycle::new(),
                    progress: ProgressState::default(),
                    speed_timer: None,
                    speed_generation: 0,
                    disposed: false,
                }),
                sinks: Mutex::new(Vec::new()),
                done,
            }),
        }
    }

    pub fn id(&self) -> JobId {
        self.shared.id
    }

    fn inner(&self) -> MutexGuard<'_, JobInner> {
        self.shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn sinks(&self) -> MutexGuard<'_, Vec<Arc<dyn EventSink>>> {
        self.shared
            .sinks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatch(&self, events: impl IntoIterator<Item = JobEvent>) {
        let events: Vec<JobEvent> = events.into_iter().collect();
        if events.is_empty() {
            return;
        }
        let sinks = self.sinks().clone();
        for event in &events {
            robot_trace!("job {} -> {:?}", self.id(), event);
            for sink in &sinks {
                sink.emit(self.id(), event);
            }
        }
    }

    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        self.sinks().push(sink);
    }

    pub fn on_event<F>(&self, callback: F)
    where
        F: Fn(&JobEvent) + Send + Sync + 'static,
    {
        self.attach(Arc::new(FnSink(callback)));
    }

    pub fn state(&self) -> JobState {
        self.inner().lifecycle.state()
    }

    pub fn is_finished(&self) -> bool {
        self.inner().lifecycle.is_finished()
    }

    pub fn is_suspended(&self) -> bool {
        self.inner().lifecycle.is_suspended()
    }

    pub fn error(&self) -> Option<JobError> {
        self.inner().lifecycle.error().cloned()
    }

    pub fn set_error(&self, error: JobError) {
        self.inner().lifecycle.set_error(error);
    }

    pub fn capabilities(&self) -> Capabilities {
        self.inner().lifecycle.capabilities()
    }

    pub fn set_capabilities(&self, capabilities: Capabilities) {
        self.inner().lifecycle.set_capabilities(capabilities);
    }

    pub fn is_auto_delete(&self) -> bool {
        self.inner().lifecycle.is_auto_delete()
    }

    pub fn set_auto_delete(&self, auto_delete: bool) {
        self.inner().lifecycle.set_auto_delete(auto_delete);
    }

    /// True once the job released its observers after finishing.
    pub fn is_disposed(&self) -> bool {
        self.inner().disposed
    }

    pub fn progress_unit(&self) -> Unit {
        self.inner().progress.progress_unit()
    }

    pub fn set_progress_unit(&self, unit: Unit) {
        self.inner().progress.set_progress_unit(unit);
    }

    pub fn percent(&self) -> u64 {
        self.inner().progress.percent()
    }

    pub fn processed_amount(&self, unit: Unit) -> u64 {
        self.inner().progress.processed_amount(unit)
    }

    pub fn total_amount(&self, unit: Unit) -> u64 {
        self.inner().progress.total_amount(unit)
    }

    pub fn set_processed_amount(&self, unit: Unit, amount: u64) {
        let events = self.inner().progress.set_processed_amount(unit, amount);
        self.dispatch(events);
    }

    pub fn set_total_amount(&self, unit: Unit, amount: u64) {
        let events = self.inner().progress.set_total_amount(unit, amount);
        self.dispatch(events);
    }

    pub fn set_percent(&self, percent: u64) {
        let event = self.inner().progress.set_percent(percent);
        self.dispatch(event);
    }

    /// Reports the current transfer speed and re-arms the quiet timer.
    ///
    /// Outside a tokio runtime the speed is reported but no zero-speed
    /// follow-up is scheduled.
    pub fn emit_speed(&self, bytes_per_second: u64) {
        self.dispatch([JobEvent::Speed(bytes_per_second)]);

        let Ok(runtime) = Handle::try_current() else {
            robot_trace!("job {}: no runtime, speed timer not armed", self.id());
            return;
        };

        let mut inner = self.inner();
        inner.speed_generation += 1;
        let generation = inner.speed_generation;
        let weak = Arc::downgrade(&self.shared);
        let timer = runtime.spawn(async move {
            tokio::time::sleep(SPEED_QUIET_PERIOD).await;
            if let Some(shared) = weak.upgrade() {
                BaseJob { shared }.speed_quiet(generation);
            }
        });
        if let Some(previous) = inner.speed_timer.replace(timer) {
            previous.abort();
        }
    }

    fn speed_quiet(&self, generation: u64) {
        {
            let mut inner = self.inner();
            if inner.speed_generation != generation || inner.lifecycle.is_finished() {
                return;
            }
            inner.speed_timer = None;
        }
        self.dispatch([JobEvent::Speed(0)]);
    }

    pub fn emit_description(&self, description: Description) {
        self.dispatch([JobEvent::Description(description)]);
    }

    pub fn emit_info_message(&self, message: impl Into<String>) {
        self.dispatch([JobEvent::InfoMessage(message.into())]);
    }

    pub fn emit_configuration_changed(&self) {
        self.dispatch([JobEvent::ConfigurationChanged]);
    }

    /// `Created → Scheduled`; false when the job was started before or has
    /// already finished.
    pub fn mark_scheduled(&self) -> bool {
        self.inner().lifecycle.schedule()
    }

    pub fn mark_running(&self) -> bool {
        self.inner().lifecycle.begin()
    }

    /// Records the suspension and notifies observers. False if the job was
    /// already suspended.
    pub fn mark_suspended(&self) -> bool {
        let event = self.inner().lifecycle.mark_suspended();
        let changed = event.is_some();
        self.dispatch(event);
        changed
    }

    pub fn mark_resumed(&self) -> bool {
        let event = self.inner().lifecycle.mark_resumed();
        let changed = event.is_some();
        self.dispatch(event);
        changed
    }

    /// Finishes the job: `Result` (when `emit_result`) then `Finished`.
    ///
    /// # Panics
    ///
    /// Panics if the job already finished.
    pub fn finish_job(&self, emit_result: bool) {
        let events = self.inner().lifecycle.finish(emit_result);
        self.complete(events);
    }

    /// Finishes the job reporting its result. Returns false, and emits
    /// nothing, when the job had already finished.
    pub fn emit_result(&self) -> bool {
        self.finish_with(None, None, true)
    }

    /// Atomically records `error`, emits `notification` and finishes.
    ///
    /// Whoever gets here first wins; later callers get `false` and their
    /// error and notification are discarded.
    pub fn finish_with(
        &self,
        error: Option<JobError>,
        notification: Option<JobEvent>,
        emit_result: bool,
    ) -> bool {
        let events = {
            let mut inner = self.inner();
            if inner.lifecycle.is_finished() {
                return false;
            }
            if let Some(error) = error {
                inner.lifecycle.set_error(error);
            }
            let mut events: Vec<JobEvent> = notification.into_iter().collect();
            events.extend(inner.lifecycle.finish(emit_result));
            if let Some(timer) = inner.speed_timer.take() {
                timer.abort();
            }
            events
        };
        self.complete(events);
        true
    }

    fn complete(&self, events: Vec<JobEvent>) {
        robot_debug!("job {} finished: {:?}", self.id(), self.state());
        self.dispatch(events);
        self.shared.done.send_replace(true);
        if self.is_auto_delete() {
            self.schedule_dispose();
        }
    }

    fn schedule_dispose(&self) {
        let Ok(runtime) = Handle::try_current() else {
            self.dispose();
            return;
        };
        let weak = Arc::downgrade(&self.shared);
        runtime.spawn(async move {
            if let Some(shared) = weak.upgrade() {
                let job = BaseJob { shared };
                if job.is_auto_delete() {
                    job.dispose();
                }
            }
        });
    }

    /// Releases observers and timers. The job's state stays readable.
    pub fn dispose(&self) {
        let timer = {
            let mut inner = self.inner();
            inner.disposed = true;
            inner.speed_timer.take()
        };
        if let Some(timer) = timer {
            timer.abort();
        }
        self.sinks().clear();
        robot_debug!("job {} disposed", self.id());
    }

    /// Resolves once the job has finished.
    pub async fn wait_finished(&self) {
        let mut done = self.shared.done.subscribe();
        let _ = done.wait_for(|finished| *finished).await;
    }
}

/// A unit of asynchronous work with an observable lifecycle.
///
/// Implementors supply `start` and optionally the kill/suspend/resume hooks;
/// the provided methods handle the bookkeeping around them.
pub trait Job: Send + Sync {
    fn base(&self) -> &BaseJob;

    /// Schedules the work. Must return promptly; the work itself runs on
    /// the runtime and ends with the job finishing. Implementations must not
    /// panic when no runtime is available.
    fn start(&self);

    fn do_kill(&self) -> bool {
        false
    }

    fn do_suspend(&self) -> bool {
        false
    }

    fn do_resume(&self) -> bool {
        false
    }

    fn error_string(&self) -> String {
        self.base()
            .error()
            .map(|err| err.message())
            .unwrap_or_default()
    }

    /// Aborts the job. Killing a finished job is a no-op that succeeds.
    fn kill(&self, verbosity: KillVerbosity) -> bool {
        let base = self.base();
        if base.is_finished() {
            return true;
        }
        if !self.do_kill() {
            robot_debug!("job {} refused to be killed", base.id());
            return false;
        }
        base.finish_with(
            Some(JobError::new(ErrorCode::Killed)),
            None,
            verbosity == KillVerbosity::EmitResult,
        );
        true
    }

    fn suspend(&self) -> bool {
        let base = self.base();
        if base.is_suspended() || base.is_finished() {
            return false;
        }
        self.do_suspend() && base.mark_suspended()
    }

    fn resume(&self) -> bool {
        let base = self.base();
        if !base.is_suspended() {
            return false;
        }
        self.do_resume() && base.mark_resumed()
    }

    /// Starts the job and blocks until it finished, driving a private
    /// runtime meanwhile. Returns true when the job ended without error.
    ///
    /// # Panics
    ///
    /// Panics when called from within a tokio runtime.
    fn exec(&self) -> bool {
        assert!(
            Handle::try_current().is_err(),
            "exec() cannot block inside an async runtime"
        );
        let base = self.base();
        let was_auto_delete = base.is_auto_delete();
        base.set_auto_delete(false);

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(async {
                if matches!(base.state(), JobState::Created) {
                    self.start();
                }
                base.wait_finished().await;
            }),
            Err(err) => {
                robot_error!("job {}: failed to build a runtime: {}", base.id(), err);
            }
        }

        base.set_auto_delete(was_auto_delete);
        if was_auto_delete && base.is_finished() {
            base.dispose();
        }
        base.is_finished() && base.error().is_none()
    }
}
