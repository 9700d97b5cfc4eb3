use crate::handler::HandlerSlot;
use crate::record::LogRecord;
use crate::severity::Severity;

/// Ordered set of handler slots a record is dispatched to.
///
/// Each slot receives its own copy of the record, so attributes injected by
/// one slot's filters are not visible to the next slot.
#[derive(Default)]
pub struct Pipeline {
    slots: Vec<HandlerSlot>,
}

impl Pipeline {
    pub fn new(slots: Vec<HandlerSlot>) -> Self {
        Self { slots }
    }

    pub fn push(&mut self, slot: HandlerSlot) {
        self.slots.push(slot);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Lowest severity any slot accepts; `None` when there are no slots.
    pub fn min_severity(&self) -> Option<Severity> {
        self.slots.iter().map(HandlerSlot::min_severity).min()
    }

    /// Dispatch to every slot. Returns how many slots emitted the record.
    pub fn dispatch(&self, record: LogRecord) -> usize {
        let Some((last, rest)) = self.slots.split_last() else {
            return 0;
        };
        let mut emitted = rest.iter().filter(|slot| slot.handle(record.clone())).count();
        if last.handle(record) {
            emitted += 1;
        }
        emitted
    }
}
