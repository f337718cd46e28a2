//! One ready-to-run schedule generation.

use std::sync::Arc;

use parche_graph::{NodeId, Schedule, StepKind};

use crate::delay_line::DelayLine;
use crate::processor::{BlockProcessor, ProcessorFactory};

/// A processor instance bound to the node it renders.
///
/// The node id and type name stay alongside the boxed DSP so state can be
/// carried into the next generation when the node survives a recompile.
pub(crate) struct ProcCell {
    pub(crate) node: NodeId,
    pub(crate) type_name: &'static str,
    pub(crate) dsp: Box<dyn BlockProcessor>,
}

/// Everything the audio thread needs to run one schedule.
///
/// Built on the editing thread, handed across whole, consumed at a block
/// boundary. It carries every allocation execution will touch: the slot
/// buffer pool, a live copy of the parameter table, one processor per
/// `Node` step, and one ring per delay node. The block loop itself never
/// allocates.
pub struct ScheduleUpdate {
    pub(crate) schedule: Arc<Schedule>,
    pub(crate) slots: Vec<f32>,
    pub(crate) params: Vec<f32>,
    pub(crate) processors: Vec<ProcCell>,
    pub(crate) rings: Vec<DelayLine>,
    pub(crate) block_size: usize,
}

impl ScheduleUpdate {
    /// Assemble a generation: zeroed slot buffers, the schedule's parameter
    /// snapshot, fresh processors from `factory`, and zeroed delay rings.
    pub fn new(
        schedule: Arc<Schedule>,
        block_size: usize,
        factory: &dyn ProcessorFactory,
    ) -> Self {
        let slots = vec![0.0; schedule.slot_count() * block_size];
        let params = schedule.params().to_vec();

        let mut processors = Vec::with_capacity(schedule.processor_count());
        for step in schedule.steps() {
            if let StepKind::Node { .. } = step.kind {
                processors.push(ProcCell {
                    node: step.node,
                    type_name: step.type_name,
                    dsp: factory.create(step.type_name),
                });
            }
        }

        let rings = schedule
            .delays()
            .iter()
            .map(|spec| DelayLine::new(spec.capacity))
            .collect();

        Self {
            schedule,
            slots,
            params,
            processors,
            rings,
            block_size,
        }
    }

    /// The schedule this generation runs.
    pub fn schedule(&self) -> &Arc<Schedule> {
        &self.schedule
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parche_graph::{Action, EngineConfig, NodeRegistry, PatchGraph, compile};

    use super::*;
    use crate::processor::SilenceFactory;

    fn patch() -> (PatchGraph, EngineConfig) {
        let mut graph = PatchGraph::new(Arc::new(NodeRegistry::new()));
        for ty in ["sine", "delay"] {
            graph
                .apply(&Action::CreateNode {
                    node_type: ty.to_string(),
                    init_params: None,
                    node_id: None,
                })
                .unwrap();
        }
        (graph, EngineConfig::default())
    }

    #[test]
    fn test_update_preallocates_everything() {
        let (graph, config) = patch();
        let schedule = Arc::new(compile(&graph, &config).unwrap());
        let update = ScheduleUpdate::new(Arc::clone(&schedule), config.block_size, &SilenceFactory);

        assert_eq!(
            update.slots.len(),
            schedule.slot_count() * config.block_size
        );
        assert_eq!(update.params, schedule.params());
        // sine is a Node step; the delay halves are engine-internal.
        assert_eq!(update.processors.len(), 1);
        assert_eq!(update.rings.len(), 1);
        assert_eq!(update.rings[0].capacity(), config.delay_ring_capacity());
    }
}
