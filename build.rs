//! Build script for Aim Lens.
//!
//! Only the overlay build needs code generation: `tauri_build` reads
//! `tauri.conf.json` and `capabilities/` and emits the context consumed
//! by `tauri::generate_context!()`.

fn main() {
    #[cfg(feature = "overlay")]
    tauri_build::build();
}
