use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut includes = vec![PathBuf::from("proto")];

    // Fall back to the vendored protoc when the host does not provide one.
    if std::env::var_os("PROTOC").is_none() {
        let protoc = protoc_bin_vendored::protoc_bin_path()
            .map_err(|e| format!("vendored protoc: {e}"))?;
        // SAFETY: the build script is single-threaded at this point.
        unsafe { std::env::set_var("PROTOC", protoc) };
        includes.push(
            protoc_bin_vendored::include_path().map_err(|e| format!("vendored includes: {e}"))?,
        );
    }

    tonic_prost_build::configure()
        .compile_protos(&[PathBuf::from("proto/srvmon/v1/srvmon.proto")], &includes)?;

    println!("cargo:rerun-if-changed=proto");
    Ok(())
}
