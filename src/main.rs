/// Native helper: print how a file would be split into upload chunks.
///
/// Usage: `dankbank <file> [chunk-size-kb]`
#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use std::process::ExitCode;

    use dankbank::config::{AppConfig, UploadMode};
    use dankbank::UploadError;
    use dankbank::constants::{BYTES_PER_KB, DEFAULT_CHUNK_SIZE_KB};
    use dankbank::services::JsonFileStore;
    use dankbank::upload::{ChunkPlan, UploadFile, chunk_headers};

    let config = AppConfig::default_path()
        .and_then(|path| JsonFileStore::open(path).ok())
        .map(|store| AppConfig::load_from_store(&store))
        .unwrap_or_default();
    dankbank::logging::init(config.log_level);

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: dankbank <file> [chunk-size-kb]");
        return ExitCode::FAILURE;
    };
    let configured_kb = match config.upload.mode {
        UploadMode::Chunked { chunk_size_kb } => chunk_size_kb,
        UploadMode::Whole { .. } => DEFAULT_CHUNK_SIZE_KB,
    };
    let chunk_size_kb = match args.next().map(|arg| arg.parse::<u64>()) {
        Some(Ok(kb)) => kb,
        Some(Err(e)) => {
            eprintln!("Invalid chunk size: {}", e);
            return ExitCode::FAILURE;
        }
        None => configured_kb,
    };

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Failed to read {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };
    let name = std::path::Path::new(&path)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.clone());
    let file = UploadFile::new(name, bytes);

    let plan = match chunk_size_kb
        .checked_mul(BYTES_PER_KB)
        .ok_or(UploadError::InvalidChunkSize)
        .and_then(|chunk_size| ChunkPlan::new(file.size(), chunk_size))
    {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Cannot plan upload: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let identifier = uuid::Uuid::new_v4().simple().to_string();
    println!(
        "{} ({} bytes): {} chunks of {} KB, key {}",
        file.name(),
        file.size(),
        plan.chunks_total(),
        chunk_size_kb,
        file.key()
    );
    // Dispatch order: highest index first.
    for chunk in plan.initial_queue() {
        let range = plan.range(chunk);
        println!("chunk {:>4}  bytes {}..{}", chunk, range.start, range.end);
        for (name, value) in chunk_headers(&plan, chunk, &identifier, &file) {
            println!("    {}: {}", name, value);
        }
    }
    ExitCode::SUCCESS
}

// WASM doesn't use main(), it uses wasm_bindgen's start function
#[cfg(target_arch = "wasm32")]
fn main() {}
