//! Caller-supplied seams: building one unit of work and classifying its outcome.
use reqwest::Request;
use std::collections::HashMap;

/// Boxed error type accepted from unit builders.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Builds one dispatchable request. Invoked once per unit of work, so builders
/// are free to vary the request between invocations (templated bodies, rotating
/// ids, and so on). A build failure is recorded as a failed unit with status 0;
/// it never aborts the run.
pub trait UnitBuilder: Send + Sync + 'static {
    fn build(&self) -> Result<Request, BoxError>;
}

impl<F, E> UnitBuilder for F
where
    F: Fn() -> Result<Request, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn build(&self) -> Result<Request, BoxError> {
        self().map_err(Into::into)
    }
}

/// Classification of one raw response.
#[derive(Debug, Clone, Default)]
pub struct Outcome {
    pub success: bool,
    /// Open key-value bag for diagnostic context, surfaced verbatim on the
    /// record (e.g. an error message on failure).
    pub metadata: HashMap<String, String>,
}

impl Outcome {
    pub fn pass() -> Self {
        Self {
            success: true,
            metadata: HashMap::new(),
        }
    }

    pub fn fail() -> Self {
        Self {
            success: false,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Classifies a fully-read response body and status code into an [`Outcome`].
///
/// Classifiers are total functions: anomalies are signalled through the
/// outcome's success flag and metadata, never by failing.
pub trait Classifier: Send + Sync + 'static {
    fn classify(&self, body: &[u8], status: u16) -> Outcome;
}

impl<F> Classifier for F
where
    F: Fn(&[u8], u16) -> Outcome + Send + Sync + 'static,
{
    fn classify(&self, body: &[u8], status: u16) -> Outcome {
        self(body, status)
    }
}

/// Default classification policy: a unit succeeds iff the status code is 200.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusOkClassifier;

impl Classifier for StatusOkClassifier {
    fn classify(&self, _body: &[u8], status: u16) -> Outcome {
        if status == 200 {
            Outcome::pass()
        } else {
            Outcome::fail()
        }
    }
}
