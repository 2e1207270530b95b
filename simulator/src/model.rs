use std::collections::BTreeMap;

pub(crate) type Rows = BTreeMap<i64, String>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Insert { id: i64, value: String },
    Update { id: i64, value: String },
    Delete { id: i64 },
    Select,
    Batch { ids: Vec<i64> },
    SetManual,
    SetAuto,
    Commit,
    Rollback,
    Reopen,
}

/// What one simulated connection has done since its last commit.
#[derive(Debug, Clone, Default)]
pub(crate) struct TaskState {
    pub(crate) id: usize,
    pub(crate) manual: bool,
    /// Committed rows plus this task's uncommitted writes, once it has written.
    pub(crate) pending: Option<Rows>,
}

impl TaskState {
    pub(crate) fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

/// Committed contents of the simulated table.
#[derive(Debug, Clone, Default)]
pub(crate) struct Model {
    pub(crate) committed: Rows,
}

impl Model {
    /// Rows a successful write by `task` starts from.
    pub(crate) fn write_view<'a>(&'a self, task: &'a TaskState) -> &'a Rows {
        task.pending.as_ref().unwrap_or(&self.committed)
    }

    /// Record a successful write; auto-commit writes land immediately.
    pub(crate) fn apply_write(&mut self, task: &mut TaskState, rows: Rows) {
        if task.manual {
            task.pending = Some(rows);
        } else {
            self.committed = rows;
        }
    }

    pub(crate) fn commit(&mut self, task: &mut TaskState) {
        if let Some(rows) = task.pending.take() {
            self.committed = rows;
        }
    }

    pub(crate) fn rollback(task: &mut TaskState) {
        task.pending = None;
    }

    /// Ids a delete or update can usefully target.
    pub(crate) fn known_ids(&self) -> Vec<i64> {
        self.committed.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_writes_stay_pending_until_commit() {
        let mut model = Model::default();
        let mut task = TaskState::new(0);
        task.manual = true;

        let mut rows = model.write_view(&task).clone();
        rows.insert(1, "a".into());
        model.apply_write(&mut task, rows);
        assert!(model.committed.is_empty());

        model.commit(&mut task);
        assert_eq!(model.committed.get(&1).map(String::as_str), Some("a"));
        assert!(task.pending.is_none());
    }

    #[test]
    fn rollback_drops_pending() {
        let mut model = Model::default();
        let mut task = TaskState::new(0);
        task.manual = true;
        model.apply_write(&mut task, Rows::from([(1, "a".to_string())]));
        Model::rollback(&mut task);
        model.commit(&mut task);
        assert!(model.committed.is_empty());
    }
}
