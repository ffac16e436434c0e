use super::result::AnalysisResult;
use super::status::{GlobalStatus, InitialData, RunError};
use std::collections::BTreeMap;
use tokio::sync::mpsc;

pub type OutputTrees = BTreeMap<String, Option<serde_json::Value>>;

/// Receiver of everything a run produces. Every method defaults to a no-op.
///
/// Calls come from the run's driver task one at a time, results in
/// completion order.
pub trait AnalysisCallbacks: Send + 'static {
    fn on_global_status(&mut self, _status: GlobalStatus) {}

    fn on_initial_data(&mut self, _data: InitialData) {}

    fn on_result(&mut self, _result: AnalysisResult) {}

    /// Output trees by dataset; `None` where building the tree failed
    fn on_tree(&mut self, _trees: OutputTrees) {}

    fn on_error(&mut self, _error: RunError) {}

    fn on_complete(&mut self) {}
}

impl AnalysisCallbacks for () {}

/// Everything a run produces, as a single event stream
#[derive(Debug)]
pub enum AnalysisEvent {
    GlobalStatus(GlobalStatus),
    InitialData(InitialData),
    Result(Box<AnalysisResult>),
    Trees(OutputTrees),
    Error(RunError),
    Complete,
}

/// Forwards every callback as an [`AnalysisEvent`]. A closed receiver just
/// drops the events.
impl AnalysisCallbacks for mpsc::UnboundedSender<AnalysisEvent> {
    fn on_global_status(&mut self, status: GlobalStatus) {
        let _ = self.send(AnalysisEvent::GlobalStatus(status));
    }

    fn on_initial_data(&mut self, data: InitialData) {
        let _ = self.send(AnalysisEvent::InitialData(data));
    }

    fn on_result(&mut self, result: AnalysisResult) {
        let _ = self.send(AnalysisEvent::Result(Box::new(result)));
    }

    fn on_tree(&mut self, trees: OutputTrees) {
        let _ = self.send(AnalysisEvent::Trees(trees));
    }

    fn on_error(&mut self, error: RunError) {
        let _ = self.send(AnalysisEvent::Error(error));
    }

    fn on_complete(&mut self) {
        let _ = self.send(AnalysisEvent::Complete);
    }
}
