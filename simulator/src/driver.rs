use std::time::{Duration, Instant};

use async_sql::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::args::SimConfig;
use crate::generation::{IdSource, next_op};
use crate::logging::EventLog;
use crate::model::{Model, Op, Rows, TaskState};

const TABLE_DDL: &str =
    "CREATE TABLE IF NOT EXISTS sim_kv (id INTEGER PRIMARY KEY, value TEXT NOT NULL)";
const INSERT: &str = "INSERT INTO sim_kv (id, value) VALUES (?, ?)";

/// Outcome label for a step that did not violate the model.
type StepResult = Result<String, String>;

pub(crate) async fn run(config: SimConfig, rng: &mut ChaCha8Rng) -> Result<(), String> {
    let connector = SqliteConnector::builder(config.db.to_string_lossy().into_owned())
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .build();

    let observer = connector.connect().await.map_err(describe)?;
    observer.execute(TABLE_DDL).await.map_err(describe)?;
    observer
        .execute("DELETE FROM sim_kv")
        .await
        .map_err(describe)?;

    let mut conns = Vec::with_capacity(config.tasks);
    for _ in 0..config.tasks {
        conns.push(connector.connect().await.map_err(describe)?);
    }
    let mut tasks: Vec<TaskState> = (0..config.tasks).map(TaskState::new).collect();
    let mut model = Model::default();
    let mut ids = IdSource::new();
    let mut events = EventLog::new(config.tail_steps);

    let max_steps = config.iterations.unwrap_or(u64::MAX);
    let deadline = config
        .duration_ms
        .map(|ms| Instant::now() + Duration::from_millis(ms));
    let mut busy = 0_u64;

    let mut step: u64 = 0;
    while step < max_steps && deadline.is_none_or(|d| Instant::now() < d) {
        let task_id = rng.random_range(0..tasks.len());
        let op = next_op(&tasks[task_id], &model, &mut ids, &config, rng);
        let outcome = apply(
            &connector,
            &mut conns[task_id],
            &mut tasks[task_id],
            &mut model,
            &op,
        )
        .await;

        let checked = match outcome {
            Ok(label) => {
                if label.starts_with("busy") {
                    busy += 1;
                }
                events.record(format!("step={step} task={task_id} op={op:?} result={label}"));
                check(&observer, &conns[task_id], &tasks[task_id], &model).await
            }
            Err(reason) => Err(reason),
        };
        if let Err(reason) = checked {
            events.record(format!("step={step} task={task_id} op={op:?} result=FAILED"));
            events.dump_failure(&reason);
            return Err(reason);
        }
        step += 1;
    }

    for conn in conns {
        conn.close().await.map_err(describe)?;
    }
    observer.close().await.map_err(describe)?;

    tracing::info!(
        "complete: steps={} tasks={} rows={} busy={}",
        step,
        config.tasks,
        model.committed.len(),
        busy
    );
    Ok(())
}

fn describe(err: SqlClientError) -> String {
    format!("{err:?}")
}

/// Busy is an expected outcome under contention; anything else fails the run.
fn busy_or_fail(err: SqlClientError) -> StepResult {
    match err {
        SqlClientError::ConnectionBusy => Ok("busy".to_string()),
        other => Err(format!("unexpected error: {other:?}")),
    }
}

async fn apply(
    connector: &SqliteConnector,
    conn: &mut Connection,
    task: &mut TaskState,
    model: &mut Model,
    op: &Op,
) -> StepResult {
    match op {
        Op::Insert { id, value } => {
            match conn
                .update_with_params(INSERT, params![*id, value.as_str()])
                .await
            {
                Ok(outcome) => {
                    if outcome.updated != 1 || outcome.keys != vec![SqlValue::Int(*id)] {
                        return Err(format!("insert of {id} reported {outcome:?}"));
                    }
                    let mut rows = model.write_view(task).clone();
                    rows.insert(*id, value.clone());
                    model.apply_write(task, rows);
                    Ok("ok".to_string())
                }
                Err(err) => busy_or_fail(err),
            }
        }
        Op::Update { id, value } => {
            let result = conn
                .update_with_params(
                    "UPDATE sim_kv SET value = ? WHERE id = ?",
                    params![value.as_str(), *id],
                )
                .await;
            write_by_id(task, model, *id, result, |rows| {
                if let Some(slot) = rows.get_mut(id) {
                    slot.clone_from(value);
                }
            })
        }
        Op::Delete { id } => {
            let result = conn
                .update_with_params("DELETE FROM sim_kv WHERE id = ?", params![*id])
                .await;
            write_by_id(task, model, *id, result, |rows| {
                rows.remove(id);
            })
        }
        Op::Select => match conn.query("SELECT id, value FROM sim_kv ORDER BY id").await {
            Ok(rs) => {
                let rows = to_rows(&rs)?;
                let expected = if task.manual {
                    task.pending.as_ref()
                } else {
                    Some(&model.committed)
                };
                match expected {
                    Some(expected) if *expected != rows => Err(format!(
                        "select saw {} rows, model has {}",
                        rows.len(),
                        expected.len()
                    )),
                    _ => Ok(format!("rows={}", rows.len())),
                }
            }
            Err(err) => busy_or_fail(err),
        },
        Op::Batch { ids } => {
            let sets = ids
                .iter()
                .map(|id| params![*id, format!("batch-{id}")])
                .collect();
            let outcome = conn.batch_with_params(INSERT, sets).await.map_err(describe)?;
            let mut rows = model.write_view(task).clone();
            for id in ids.iter().take(outcome.len()) {
                rows.insert(*id, format!("batch-{id}"));
            }
            let applied = outcome.len();
            if applied > 0 {
                model.apply_write(task, rows);
            }
            match outcome.truncated {
                None => Ok(format!("entries={applied}")),
                Some(truncation) => busy_or_fail(truncation.error)
                    .map(|label| format!("{label} at={}", truncation.index)),
            }
        }
        Op::SetManual => {
            conn.set_auto_commit(false).await.map_err(describe)?;
            task.manual = true;
            Ok("ok".to_string())
        }
        Op::SetAuto => {
            conn.set_auto_commit(true).await.map_err(describe)?;
            model.commit(task);
            task.manual = false;
            Ok("ok".to_string())
        }
        Op::Commit => {
            conn.commit().await.map_err(describe)?;
            model.commit(task);
            Ok("ok".to_string())
        }
        Op::Rollback => {
            conn.rollback().await.map_err(describe)?;
            Model::rollback(task);
            Ok("ok".to_string())
        }
        Op::Reopen => {
            conn.close().await.map_err(describe)?;
            *conn = connector.connect().await.map_err(describe)?;
            Model::rollback(task);
            task.manual = false;
            Ok(format!("conn={}", conn.id()))
        }
    }
}

fn write_by_id(
    task: &mut TaskState,
    model: &mut Model,
    id: i64,
    result: Result<UpdateOutcome, SqlClientError>,
    change: impl FnOnce(&mut Rows),
) -> StepResult {
    match result {
        Ok(outcome) => {
            let mut rows = model.write_view(task).clone();
            let expected = u64::from(rows.contains_key(&id));
            if outcome.updated != expected {
                return Err(format!(
                    "write to {id} touched {} rows, model expects {expected}",
                    outcome.updated
                ));
            }
            change(&mut rows);
            model.apply_write(task, rows);
            Ok(format!("updated={}", outcome.updated))
        }
        Err(err) => busy_or_fail(err),
    }
}

fn to_rows(rs: &ResultSet) -> Result<Rows, String> {
    rs.rows()
        .map(|row| -> Result<(i64, String), SqlClientError> {
            let id = row.get_i64("id")?.unwrap_or_default();
            let value = row.get_str("value")?.unwrap_or_default().to_string();
            Ok((id, value))
        })
        .collect::<Result<Rows, _>>()
        .map_err(describe)
}

/// Committed state seen by an auto-commit observer must match the model, and
/// the connection's mode must match the task's.
async fn check(
    observer: &Connection,
    conn: &Connection,
    task: &TaskState,
    model: &Model,
) -> Result<(), String> {
    let expected_state = if task.manual {
        TxState::InTransaction
    } else {
        TxState::AutoCommit
    };
    if conn.state() != expected_state {
        return Err(format!(
            "task {} connection in {:?}, model expects {:?}",
            task.id,
            conn.state(),
            expected_state
        ));
    }

    let rs = observer
        .query("SELECT id, value FROM sim_kv ORDER BY id")
        .await
        .map_err(describe)?;
    let observed = to_rows(&rs)?;
    if observed != model.committed {
        return Err(format!(
            "observer saw {} committed rows, model has {}",
            observed.len(),
            model.committed.len()
        ));
    }
    Ok(())
}
