use std::fs;
use std::path::{Path, PathBuf};

use tagshelf::catalog::CatalogDb;
use tagshelf::error::CatalogError;
use tagshelf::infra::config::AppConfig;
use tagshelf::ingest::{self, OpaquePathPlanner, StoragePathPlanner, UploadedFile};
use tagshelf::search::TagFilter;
use tagshelf::{maintenance, projects, tags};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = AppConfig::default();
    let db = CatalogDb::new(config.catalog_path.clone());

    if let Err(error) = db.initialize() {
        eprintln!("failed to initialize catalog: {error}");
        std::process::exit(1);
    }

    if args.len() <= 1 {
        print_usage();
        return;
    }

    let result = match args[1].as_str() {
        "init" => Ok(()),
        "ingest" => run_ingest(&db, &config, &args[2..]),
        "list" => run_list(&db),
        "search" => run_search(&db, &args[2..]),
        "tags" => run_tags(&db, args.get(2).map(String::as_str)),
        "retag" => run_retag(&db, &args[2..]),
        "delete" => run_delete(&db, &args[2..]),
        "projects" => run_projects(&db),
        "reconcile" => run_reconcile(&db, &config),
        _ => {
            print_usage();
            std::process::exit(2);
        }
    };

    if let Err(error) = result {
        if error.is_not_found() {
            eprintln!("{error}");
            std::process::exit(3);
        }
        eprintln!("{error}");
        std::process::exit(1);
    }
}

fn run_ingest(db: &CatalogDb, config: &AppConfig, args: &[String]) -> Result<(), CatalogError> {
    let mut sources = Vec::new();
    let mut raw_tags = Vec::new();
    let mut index = 0;

    while index < args.len() {
        if args[index] == "--tags" {
            let list = args.get(index + 1).ok_or_else(|| {
                CatalogError::InvalidInput("--tags requires a comma-separated list".to_string())
            })?;
            raw_tags = list
                .split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect();
            index += 2;
        } else {
            sources.push(PathBuf::from(&args[index]));
            index += 1;
        }
    }

    let upload_dir = Path::new(&config.upload_dir);
    fs::create_dir_all(upload_dir)
        .map_err(|error| CatalogError::Io(format!("failed to create upload dir: {error}")))?;

    // Stage each source under the upload dir first, the way the upload layer
    // would have before handing the batch over.
    let mut planner = OpaquePathPlanner;
    let mut files = Vec::with_capacity(sources.len());
    for source in &sources {
        let original_name = source
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        let staged = planner.next_candidate(upload_dir, &extension);
        fs::copy(source, &staged).map_err(|error| {
            CatalogError::Io(format!("failed to stage {}: {error}", source.display()))
        })?;

        files.push(UploadedFile {
            tentative_path: staged,
            original_name,
        });
    }

    let mut conn = db.open_connection()?;
    let report = ingest::ingest_batch(
        &mut conn,
        upload_dir,
        &files,
        &raw_tags,
        None,
        &mut planner,
    )?;

    println!(
        "ingested {} file(s), {} freeform tag(s)",
        report.count,
        report.freeform_tags.len()
    );
    for path in &report.stored_paths {
        println!("  {path}");
    }
    Ok(())
}

fn run_list(db: &CatalogDb) -> Result<(), CatalogError> {
    let conn = db.open_connection()?;
    let hits = tagshelf::search::search_images(&conn, &TagFilter::default())?;

    if hits.is_empty() {
        println!("no images in catalog");
        return Ok(());
    }

    for hit in hits {
        println!(
            "{}\t{}\t{}",
            hit.record.id,
            hit.record.filepath,
            hit.tags.join(",")
        );
    }
    Ok(())
}

fn run_search(db: &CatalogDb, args: &[String]) -> Result<(), CatalogError> {
    let tag_list = args.first().map(String::as_str).unwrap_or_default();
    let mode = args.get(1).map(String::as_str).unwrap_or("OR");

    let conn = db.open_connection()?;
    let filter = TagFilter::from_query(tag_list, mode);
    let hits = tagshelf::search::search_images(&conn, &filter)?;

    for hit in hits {
        println!(
            "{}\t{}\t{}",
            hit.record.id,
            hit.record.filepath,
            hit.tags.join(",")
        );
    }
    Ok(())
}

fn run_tags(db: &CatalogDb, query: Option<&str>) -> Result<(), CatalogError> {
    let conn = db.open_connection()?;
    for usage in tags::list_tags(&conn, query)? {
        println!("{}\t{}", usage.usage_count, usage.name);
    }
    Ok(())
}

fn run_retag(db: &CatalogDb, args: &[String]) -> Result<(), CatalogError> {
    let image_id = parse_id(args.first())?;
    let names: Vec<String> = args
        .get(1)
        .map(String::as_str)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();

    let mut conn = db.open_connection()?;
    let current = tags::replace_tags(&mut conn, image_id, &names)?;
    println!("{image_id}\t{}", current.join(","));
    Ok(())
}

fn run_delete(db: &CatalogDb, args: &[String]) -> Result<(), CatalogError> {
    let image_id = parse_id(args.first())?;
    let mut conn = db.open_connection()?;
    let deleted = maintenance::delete_image_and_file(&mut conn, image_id)?;
    println!("deleted image {} ({})", deleted.image_id, deleted.filepath);
    Ok(())
}

fn run_projects(db: &CatalogDb) -> Result<(), CatalogError> {
    let conn = db.open_connection()?;
    for project in projects::list_projects(&conn)? {
        let ids: Vec<String> = project.image_ids.iter().map(i64::to_string).collect();
        println!("{}\t{}\t[{}]", project.id, project.name, ids.join(","));
    }
    Ok(())
}

fn run_reconcile(db: &CatalogDb, config: &AppConfig) -> Result<(), CatalogError> {
    let conn = db.open_connection()?;
    let report = maintenance::reconcile(&conn, Path::new(&config.upload_dir))?;

    println!(
        "reconcile: {} orphan file(s), {} missing file(s)",
        report.orphan_files.len(),
        report.missing_files.len()
    );
    for path in &report.orphan_files {
        println!("  orphan: {}", path.display());
    }
    for missing in &report.missing_files {
        println!("  missing: image {} ({})", missing.image_id, missing.filepath);
    }
    Ok(())
}

fn parse_id(arg: Option<&String>) -> Result<i64, CatalogError> {
    arg.ok_or_else(|| CatalogError::InvalidInput("missing image id".to_string()))?
        .parse()
        .map_err(|_| CatalogError::InvalidInput("image id must be an integer".to_string()))
}

fn print_usage() {
    println!("usage:");
    println!("  tagshelf init");
    println!("  tagshelf ingest <file...> --tags <a,b,c>");
    println!("  tagshelf list");
    println!("  tagshelf search <tags> [AND|OR]");
    println!("  tagshelf tags [query]");
    println!("  tagshelf retag <id> <tags>");
    println!("  tagshelf delete <id>");
    println!("  tagshelf projects");
    println!("  tagshelf reconcile");
}
