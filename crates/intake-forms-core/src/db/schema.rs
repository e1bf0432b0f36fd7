//! SQLite schema definition.

/// Complete database schema for the local questionnaire store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    id TEXT PRIMARY KEY,
    fields TEXT NOT NULL DEFAULT '{}',            -- JSON object of intake fields
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- ============================================================================
-- Question bank
-- ============================================================================

CREATE TABLE IF NOT EXISTS questions (
    id TEXT PRIMARY KEY,
    text TEXT NOT NULL,
    type TEXT NOT NULL,
    unit TEXT,
    code TEXT,
    options TEXT NOT NULL DEFAULT '[]',           -- JSON array of {value, label}
    required INTEGER NOT NULL DEFAULT 0,
    origin TEXT NOT NULL CHECK (origin IN ('SYSTEM', 'CUSTOM')),
    owner TEXT,                                   -- NULL for system questions
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- A code identifies at most one question per owner
CREATE UNIQUE INDEX IF NOT EXISTS idx_questions_owner_code
    ON questions(COALESCE(owner, ''), code)
    WHERE code IS NOT NULL AND code != '';

CREATE INDEX IF NOT EXISTS idx_questions_owner ON questions(owner);

-- ============================================================================
-- Templates
-- ============================================================================

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    owner TEXT,                                   -- NULL for system templates
    name TEXT NOT NULL,
    description TEXT,
    consult_type TEXT NOT NULL CHECK (consult_type IN ('INITIAL', 'FOLLOWUP')),
    is_default INTEGER NOT NULL DEFAULT 0,
    active INTEGER NOT NULL DEFAULT 1,
    config TEXT NOT NULL DEFAULT '{}',            -- JSON object
    categories TEXT NOT NULL DEFAULT '[]',        -- JSON array of categories
    question_configs TEXT NOT NULL DEFAULT '[]',  -- JSON array of question configs
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- At most one active default per owner and consult type
CREATE UNIQUE INDEX IF NOT EXISTS idx_templates_default
    ON templates(COALESCE(owner, ''), consult_type)
    WHERE is_default = 1 AND active = 1;

CREATE INDEX IF NOT EXISTS idx_templates_owner ON templates(owner, consult_type);

-- ============================================================================
-- Consultations (append-only)
-- ============================================================================

CREATE TABLE IF NOT EXISTS consultations (
    id TEXT PRIMARY KEY,
    patient_ref TEXT NOT NULL REFERENCES patients(id),
    practitioner TEXT,
    consult_type TEXT NOT NULL CHECK (consult_type IN ('INITIAL', 'FOLLOWUP')),
    template_used TEXT REFERENCES templates(id) ON DELETE SET NULL,
    template_snapshot TEXT NOT NULL,              -- JSON snapshot, written once
    answers TEXT NOT NULL,                        -- JSON array of answers, written once
    metrics TEXT NOT NULL DEFAULT '{}',           -- JSON object
    notes TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_consultations_patient ON consultations(patient_ref, created_at);

-- Snapshot and answers never change after insert
CREATE TRIGGER IF NOT EXISTS consultations_immutable
BEFORE UPDATE ON consultations
WHEN new.template_snapshot IS NOT old.template_snapshot
  OR new.answers IS NOT old.answers
BEGIN
    SELECT RAISE(ABORT, 'consultation snapshot and answers are append-only');
END;
"#;
