// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types that describe what the system works with.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain structs and traits
//
// Keeping it free of tensors means the image logic can be
// unit tested without any backend or GPU.
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A single 2-D MRI slice with its pixel grid
pub mod slice;

// Core abstractions (traits) that other layers implement
pub mod traits;
