//! In-memory event capture for logging assertions
//!
//! Every event is kept with its level, message and fields as text. Lookups
//! go by the keys this crate logs with (`op`, `event`, `job_name`,
//! `dataset_urn`, `err_code`), so tests can ask what happened to one job
//! without parsing formatted output.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};

use runstate_core_types::schema::{
    EVENT_END_ERROR, FIELD_DATASET_URN, FIELD_ERR_CODE, FIELD_EVENT, FIELD_JOB_NAME, FIELD_OP,
};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// One recorded event
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    /// Text of field `key`, if the event carried it
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn job_name(&self) -> Option<&str> {
        self.field(FIELD_JOB_NAME)
    }

    pub fn dataset_urn(&self) -> Option<&str> {
        self.field(FIELD_DATASET_URN)
    }

    pub fn err_code(&self) -> Option<&str> {
        self.field(FIELD_ERR_CODE)
    }
}

#[derive(Default)]
struct FieldMap(BTreeMap<String, String>);

impl Visit for FieldMap {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    // Numbers, bools and `%`/`?` values all arrive here
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Shared handle to captured events; also the `Layer` that records them
#[derive(Clone, Default)]
pub struct TestCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl<S: Subscriber> Layer<S> for TestCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = FieldMap::default();
        event.record(&mut fields);
        let mut fields = fields.0;

        let captured = CapturedEvent {
            level: *event.metadata().level(),
            message: fields.remove("message"),
            fields,
        };
        self.events
            .lock()
            .map(|mut events| events.push(captured))
            .ok();
    }
}

impl TestCapture {
    /// All events recorded so far
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    fn matching(&self, keep: impl Fn(&CapturedEvent) -> bool) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| keep(e)).collect()
    }

    /// Events logged with `job_name = job_name`
    pub fn for_job(&self, job_name: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.job_name() == Some(job_name))
    }

    /// Warnings logged for `job_name`
    pub fn warnings_for_job(&self, job_name: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.level == Level::WARN && e.job_name() == Some(job_name))
    }

    /// Start, end and error events of operation `op`
    pub fn op_events(&self, op: &str) -> Vec<CapturedEvent> {
        self.matching(|e| e.op() == Some(op))
    }

    /// `err_code` of every failed run of `op`
    pub fn error_codes(&self, op: &str) -> Vec<String> {
        self.op_events(op)
            .into_iter()
            .filter(|e| e.event() == Some(EVENT_END_ERROR))
            .filter_map(|e| e.err_code().map(str::to_string))
            .collect()
    }

    /// # Panics
    ///
    /// Panics unless `op` logged an event named `event`.
    pub fn assert_op_logged(&self, op: &str, event: &str) {
        let seen: Vec<String> = self
            .op_events(op)
            .iter()
            .filter_map(|e| e.event().map(str::to_string))
            .collect();
        assert!(
            seen.iter().any(|e| e == event),
            "{} never logged '{}' (saw {:?})",
            op,
            event,
            seen
        );
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the process-wide capture subscriber and return its handle
///
/// Tests in one binary share the handle, so assertions should filter by a
/// job name or op unique to the test.
///
/// # Example
///
/// ```
/// use runstate_core::logging_facility::test_capture::init_test_capture;
/// use runstate_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("acquire_lock", job_name = "doc-job");
/// assert_eq!(capture.for_job("doc-job").len(), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let capture = TestCapture::default();
            tracing_subscriber::registry()
                .with(capture.clone())
                .try_init()
                .ok();
            capture
        })
        .clone()
}
