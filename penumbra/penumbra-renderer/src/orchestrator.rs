//! Runs the passes of a frame in graph order and records what ran.

use std::collections::HashSet;

use crate::error::RenderError;
use crate::graph::{PassGraph, PassKind};

/// Something that can execute a single pass of the current frame.
pub trait FramePasses {
    fn run_pass(&mut self, pass: PassKind) -> Result<(), RenderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Enter(PassKind),
    Exit(PassKind),
}

/// Entry and exit of every pass in the last frame.
#[derive(Debug, Clone, Default)]
pub struct PassTrace {
    events: Vec<TraceEvent>,
}

impl PassTrace {
    pub fn events(&self) -> &[TraceEvent] { &self.events }

    /// Passes that ran to completion, in order.
    pub fn completed(&self) -> Vec<PassKind> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TraceEvent::Exit(p) => Some(*p),
                TraceEvent::Enter(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct Orchestrator {
    trace: PassTrace,
    frames: u64,
}

impl Orchestrator {
    pub fn new() -> Self { Self::default() }

    pub fn trace(&self) -> &PassTrace { &self.trace }
    pub fn frames(&self) -> u64 { self.frames }

    pub fn run_frame(&mut self, graph: &PassGraph, passes: &mut impl FramePasses) -> Result<(), RenderError> {
        let order = graph.topological_order()?;
        self.trace.events.clear();
        let mut done: HashSet<PassKind> = HashSet::new();
        for pass in order {
            if let Some(missing) = graph.dependencies(pass).find(|d| !done.contains(d)) {
                return Err(RenderError::PassOrder(format!(
                    "{} started before {} completed",
                    pass.name(),
                    missing.name()
                )));
            }
            self.trace.events.push(TraceEvent::Enter(pass));
            log::debug!("pass {} begin", pass.name());
            passes.run_pass(pass)?;
            log::debug!("pass {} end", pass.name());
            self.trace.events.push(TraceEvent::Exit(pass));
            done.insert(pass);
        }
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        ran: Vec<PassKind>,
        fail_on: Option<PassKind>,
    }

    impl FramePasses for Recorder {
        fn run_pass(&mut self, pass: PassKind) -> Result<(), RenderError> {
            if self.fail_on == Some(pass) {
                return Err(RenderError::Gpu(format!("{} failed", pass.name())));
            }
            self.ran.push(pass);
            Ok(())
        }
    }

    #[test]
    fn shadow_and_gbuffer_precede_composite_every_frame() {
        let mut orch = Orchestrator::new();
        let mut rec = Recorder::default();
        for frame in 0..10 {
            let reflections = frame % 2 == 0;
            rec.ran.clear();
            orch.run_frame(&PassGraph::for_frame(reflections, PassKind::Composite), &mut rec).unwrap();
            let pos = |p| rec.ran.iter().position(|&q| q == p).unwrap();
            assert!(pos(PassKind::Shadow) < pos(PassKind::GBuffer));
            assert!(pos(PassKind::GBuffer) < pos(PassKind::Composite));
            assert_eq!(rec.ran.last(), Some(&PassKind::Composite));
            assert_eq!(rec.ran.contains(&PassKind::ReflectionTop), reflections);
            assert_eq!(orch.trace().completed(), rec.ran);
        }
        assert_eq!(orch.frames(), 10);
    }

    #[test]
    fn trace_brackets_each_pass() {
        let mut orch = Orchestrator::new();
        let mut rec = Recorder::default();
        orch.run_frame(&PassGraph::for_frame(false, PassKind::Present), &mut rec).unwrap();
        assert_eq!(
            orch.trace().events(),
            &[
                TraceEvent::Enter(PassKind::Shadow),
                TraceEvent::Exit(PassKind::Shadow),
                TraceEvent::Enter(PassKind::GBuffer),
                TraceEvent::Exit(PassKind::GBuffer),
                TraceEvent::Enter(PassKind::Present),
                TraceEvent::Exit(PassKind::Present),
            ]
        );
    }

    #[test]
    fn failed_pass_stops_the_frame() {
        let mut orch = Orchestrator::new();
        let mut rec = Recorder { fail_on: Some(PassKind::GBuffer), ..Default::default() };
        let r = orch.run_frame(&PassGraph::for_frame(true, PassKind::Composite), &mut rec);
        assert!(matches!(r, Err(RenderError::Gpu(_))));
        assert_eq!(rec.ran, vec![PassKind::Shadow]);
        assert_eq!(orch.trace().events().last(), Some(&TraceEvent::Enter(PassKind::GBuffer)));
        assert_eq!(orch.frames(), 0);
    }
}
