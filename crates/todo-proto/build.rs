//! Compiles the protobuf definitions into Rust code using tonic-prost-build.
//!
//! Uses the `protoc` from `PROTOC` when set, otherwise the vendored binary.

use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if std::env::var_os("PROTOC").is_none() {
        std::env::set_var("PROTOC", protoc_bin_vendored::protoc_bin_path()?);
    }

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);

    tonic_prost_build::configure()
        .file_descriptor_set_path(out_dir.join("todo_v1_descriptor.bin"))
        .build_server(true)
        .build_client(true)
        .emit_rerun_if_changed(true)
        .compile_protos(&["../../proto/todo/v1/todo.proto"], &["../../proto"])?;

    Ok(())
}
