//! Canonical SQLite schema for chainboard.
//!
//! Ordering is stored intrusively: each `task_states` / `tasks` row carries
//! nullable `left_id` / `right_id` references to rows of the same table.
//! There is no position column. Order is recovered by walking `right_id`
//! from the row whose `left_id` is NULL.

/// Migration v1: projects, both chain tables, and store metadata.
pub const MIGRATION_V1_SQL: &str = r"
CREATE TABLE IF NOT EXISTS projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    created_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_states (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    left_id INTEGER REFERENCES task_states(id) ON DELETE SET NULL,
    right_id INTEGER REFERENCES task_states(id) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL,
    CHECK (left_id IS NULL OR left_id <> id),
    CHECK (right_id IS NULL OR right_id <> id)
);

CREATE TABLE IF NOT EXISTS tasks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    task_state_id INTEGER NOT NULL REFERENCES task_states(id) ON DELETE CASCADE,
    name TEXT NOT NULL CHECK (length(trim(name)) > 0),
    left_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
    right_id INTEGER REFERENCES tasks(id) ON DELETE SET NULL,
    created_at_us INTEGER NOT NULL,
    CHECK (left_id IS NULL OR left_id <> id),
    CHECK (right_id IS NULL OR right_id <> id)
);

CREATE TABLE IF NOT EXISTS store_meta (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    schema_version INTEGER NOT NULL,
    created_at_us INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO store_meta (id, schema_version, created_at_us)
VALUES (1, 1, 0);
";

/// Migration v2: chain lookup indexes, name guards, and the audit table.
pub const MIGRATION_V2_SQL: &str = r"
CREATE INDEX IF NOT EXISTS idx_task_states_project_left
    ON task_states(project_id, left_id);

CREATE INDEX IF NOT EXISTS idx_task_states_project_right
    ON task_states(project_id, right_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_task_states_project_name
    ON task_states(project_id, lower(name));

CREATE INDEX IF NOT EXISTS idx_tasks_state_left
    ON tasks(task_state_id, left_id);

CREATE INDEX IF NOT EXISTS idx_tasks_state_right
    ON tasks(task_state_id, right_id);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_state_name
    ON tasks(task_state_id, lower(name));

CREATE UNIQUE INDEX IF NOT EXISTS idx_projects_name
    ON projects(lower(name));

CREATE TABLE IF NOT EXISTS node_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL CHECK (kind IN ('task_state', 'task')),
    node_id INTEGER NOT NULL,
    actor TEXT NOT NULL,
    change_type TEXT NOT NULL CHECK (change_type IN ('create', 'edit', 'delete')),
    field_name TEXT CHECK (field_name IS NULL OR field_name IN ('name', 'position', 'container')),
    old_value TEXT,
    new_value TEXT,
    changed_at_us INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_node_history_node
    ON node_history(kind, node_id, id);

UPDATE store_meta
SET schema_version = 2
WHERE id = 1;
";

/// Migration v3: task assignment.
///
/// SQLite cannot alter a CHECK constraint, so `node_history` is rebuilt to
/// accept the `assignee` field.
pub const MIGRATION_V3_SQL: &str = r"
ALTER TABLE tasks ADD COLUMN assignee TEXT
    CHECK (assignee IS NULL OR length(trim(assignee)) > 0);

CREATE INDEX IF NOT EXISTS idx_tasks_assignee
    ON tasks(assignee);

CREATE TABLE node_history_v3 (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL CHECK (kind IN ('task_state', 'task')),
    node_id INTEGER NOT NULL,
    actor TEXT NOT NULL,
    change_type TEXT NOT NULL CHECK (change_type IN ('create', 'edit', 'delete')),
    field_name TEXT CHECK (
        field_name IS NULL OR field_name IN ('name', 'position', 'container', 'assignee')
    ),
    old_value TEXT,
    new_value TEXT,
    changed_at_us INTEGER NOT NULL
);

INSERT INTO node_history_v3 (
    id, kind, node_id, actor, change_type, field_name, old_value, new_value, changed_at_us
)
SELECT id, kind, node_id, actor, change_type, field_name, old_value, new_value, changed_at_us
FROM node_history;

DROP TABLE node_history;
ALTER TABLE node_history_v3 RENAME TO node_history;

CREATE INDEX IF NOT EXISTS idx_node_history_node
    ON node_history(kind, node_id, id);

UPDATE store_meta
SET schema_version = 3
WHERE id = 1;
";

/// Indexes expected by chain lookups and name checks.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_task_states_project_left",
    "idx_task_states_project_right",
    "idx_task_states_project_name",
    "idx_tasks_state_left",
    "idx_tasks_state_right",
    "idx_tasks_state_name",
    "idx_projects_name",
    "idx_node_history_node",
    "idx_tasks_assignee",
];
