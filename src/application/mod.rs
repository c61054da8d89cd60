// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Workflow coordination only: no tensor code, no printing, no
// direct file access. Each use case wires the data, infra and ml
// layers together for one user-facing goal.

// The training workflow
pub mod train_use_case;

// The sentence translation workflow
pub mod translate_use_case;
