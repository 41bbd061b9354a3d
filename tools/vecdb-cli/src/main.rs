//! VecDB command-line shell.
//!
//! # Usage
//!
//! ```bash
//! vecdb create --dir data/demo --dim 768 --metric l2
//! vecdb load   --dir data/demo --csv data/vectors.csv
//! vecdb build  --dir data/demo --M 16 --M0 32 --efC 100
//! vecdb search --dir data/demo --query "0.1,0.2,..." --k 10 --ef 100
//! vecdb search --dir data/demo --query_csv data/queries.csv --filter lang=en
//! vecdb stats  --dir data/demo
//! vecdb demo
//! ```
//!
//! Errors go to stderr and exit with code 2.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use vecdb::{
    brute_force_top_k, csv, metadata, Collection, CollectionOptions, HnswConfig, HnswIndex,
    Metadata, MetadataFilter, Metric, VecdbError, VectorStore,
};

/// Parsed command line: positional words, `--key value` pairs, `--flag`s.
struct Args {
    pos: Vec<String>,
    kv: Vec<(String, String)>,
    flags: HashSet<String>,
}

fn parse_args() -> Args {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let mut args = Args {
        pos: Vec::new(),
        kv: Vec::new(),
        flags: HashSet::new(),
    };

    let mut i = 0;
    while i < raw.len() {
        let word = &raw[i];
        if word.starts_with("--") {
            match raw.get(i + 1) {
                Some(next) if !next.starts_with("--") => {
                    args.kv.push((word.clone(), next.clone()));
                    i += 2;
                    continue;
                }
                _ => {
                    args.flags.insert(word.clone());
                }
            }
        } else {
            args.pos.push(word.clone());
        }
        i += 1;
    }
    args
}

fn get_kv<'a>(args: &'a Args, key: &str) -> Option<&'a str> {
    args.kv
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn has_flag(args: &Args, key: &str) -> bool {
    args.flags.contains(key)
}

fn has_option(args: &Args, key: &str) -> bool {
    get_kv(args, key).is_some() || has_flag(args, key)
}

fn get_usize_or(args: &Args, key: &str, default: usize) -> Result<usize, String> {
    match get_kv(args, key) {
        Some(v) => v.parse().map_err(|_| format!("invalid {key} value: {v}")),
        None => Ok(default),
    }
}

fn get_u32_or(args: &Args, key: &str, default: u32) -> Result<u32, String> {
    match get_kv(args, key) {
        Some(v) => v.parse().map_err(|_| format!("invalid {key} value: {v}")),
        None => Ok(default),
    }
}

fn get_f32_or(args: &Args, key: &str, default: f32) -> Result<f32, String> {
    match get_kv(args, key) {
        Some(v) => v.parse().map_err(|_| format!("invalid {key} value: {v}")),
        None => Ok(default),
    }
}

fn parse_metric(s: &str) -> Result<Metric, String> {
    match s {
        "l2" | "L2" => Ok(Metric::L2),
        "cosine" | "COSINE" => Ok(Metric::Cosine),
        other => Err(format!("unknown metric: {other} (use l2|cosine)")),
    }
}

fn metric_name(metric: Metric) -> &'static str {
    match metric {
        Metric::L2 => "l2",
        Metric::Cosine => "cosine",
    }
}

fn hnsw_params_from_args(args: &Args) -> Result<HnswConfig, String> {
    Ok(HnswConfig::default()
        .with_m(get_usize_or(args, "--M", 16)?)
        .with_m0(get_usize_or(args, "--M0", 32)?)
        .with_ef_construction(get_usize_or(args, "--efC", 100)?)
        .with_diversity(get_usize_or(args, "--diversity", 1)? != 0)
        .with_seed(get_u32_or(args, "--seed", 123)?)
        .with_level_mult(get_f32_or(args, "--level_mult", 1.0)?))
}

fn parse_filter(args: &Args) -> Result<MetadataFilter, String> {
    let Some(s) = get_kv(args, "--filter") else {
        return Ok(MetadataFilter::default());
    };
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok(MetadataFilter::new(key, value))
        }
        _ => Err("filter must be in form key=value".into()),
    }
}

fn require_dir(args: &Args, cmd: &str) -> Result<PathBuf, String> {
    get_kv(args, "--dir")
        .map(PathBuf::from)
        .ok_or_else(|| format!("{cmd}: missing --dir"))
}

fn manifest_exists(dir: &Path) -> bool {
    dir.join("manifest.json").is_file()
}

fn print_vec(v: &[f32]) {
    print!("[");
    for (i, x) in v.iter().take(8).enumerate() {
        if i > 0 {
            print!(", ");
        }
        print!("{x:.6}");
    }
    if v.len() > 8 {
        print!(", ...");
    }
    print!("]");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args();
    let Some(command) = args.pos.first().map(String::as_str) else {
        print_help();
        return ExitCode::SUCCESS;
    };

    let result = match command {
        "create" => cmd_create(&args),
        "load" => cmd_load(&args),
        "build" => cmd_build(&args),
        "search" => cmd_search(&args),
        "stats" => cmd_stats(&args),
        "demo" => cmd_demo(),
        "help" => {
            print_help();
            Ok(())
        }
        other => Err(format!(
            "unknown command: {other}\n\nRun 'vecdb help' for usage."
        )),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("{msg}");
            ExitCode::from(2)
        }
    }
}

fn cmd_create(args: &Args) -> Result<(), String> {
    let dir = require_dir(args, "create")?;
    if manifest_exists(&dir) {
        return Err(format!(
            "create: manifest already exists in dir: {}",
            dir.display()
        ));
    }

    let dim = get_usize_or(args, "--dim", 0)?;
    if dim == 0 {
        return Err("create: missing --dim".into());
    }
    let metric = parse_metric(get_kv(args, "--metric").unwrap_or("l2"))?;

    let options = CollectionOptions::new(dim)
        .with_metric(metric)
        .with_hnsw(hnsw_params_from_args(args)?);

    let collection =
        Collection::create(&dir, options).map_err(|e| format!("create failed: {e}"))?;
    println!(
        "Created collection at: {} dim={dim} metric={}",
        collection.dir().display(),
        metric_name(metric)
    );
    Ok(())
}

fn cmd_load(args: &Args) -> Result<(), String> {
    let dir = require_dir(args, "load")?;
    let csv_path = get_kv(args, "--csv").ok_or("load: missing --csv")?;
    if !manifest_exists(&dir) {
        return Err(format!(
            "load: collection not found (manifest.json missing): {}",
            dir.display()
        ));
    }

    let collection = Collection::open(&dir).map_err(|e| format!("load failed: {e}"))?;
    let dim = collection.dim().map_err(|e| format!("load failed: {e}"))?;

    let options = csv::CsvOptions {
        has_header: has_flag(args, "--header"),
        has_id: true, // load requires id as first column
        infer_id: false,
        allow_metadata: has_flag(args, "--meta"),
    };

    let mut inserted = 0usize;
    csv::for_each_row(Path::new(csv_path), dim, &options, |row| {
        let id = match row.id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(VecdbError::InvalidArgument(
                    "vectors.csv must contain id as first column: id,f1,...,f_dim".into(),
                ))
            }
        };

        if options.allow_metadata {
            let raw = row.metadata_raw.as_deref().ok_or_else(|| {
                VecdbError::InvalidArgument("--meta enabled but row has no metadata column".into())
            })?;
            let meta = metadata::decode(raw)
                .map_err(|e| VecdbError::InvalidArgument(format!("metadata parse error: {e}")))?;
            collection.upsert_with_metadata(&id, &row.vec, meta)?;
        } else {
            collection.upsert(&id, &row.vec)?;
        }
        inserted += 1;
        Ok(true)
    })
    .map_err(|e| format!("load failed: {e}"))?;

    // loading invalidated any index; persist the store (and drop a stale hnsw.bin)
    collection.save().map_err(|e| format!("load failed: {e}"))?;
    println!("Loaded vectors: {inserted} into {}", dir.display());

    if get_usize_or(args, "--build", 0)? != 0 {
        collection
            .build_index()
            .and_then(|()| collection.save())
            .map_err(|e| format!("load failed: {e}"))?;
        println!("Index built and saved.");
    }
    Ok(())
}

fn cmd_build(args: &Args) -> Result<(), String> {
    let dir = require_dir(args, "build")?;
    if !manifest_exists(&dir) {
        return Err(format!(
            "build: collection not found (manifest.json missing): {}",
            dir.display()
        ));
    }

    let collection = Collection::open(&dir).map_err(|e| format!("build failed: {e}"))?;

    if let Some(metric) = get_kv(args, "--metric") {
        collection
            .set_metric(parse_metric(metric)?)
            .map_err(|e| format!("build failed: {e}"))?;
    }
    let has_any_param = ["--M", "--M0", "--efC", "--diversity", "--seed", "--level_mult"]
        .iter()
        .any(|&key| has_option(args, key));
    if has_any_param {
        collection
            .set_hnsw_params(hnsw_params_from_args(args)?)
            .map_err(|e| format!("build failed: {e}"))?;
    }

    let alive = collection
        .alive_count()
        .map_err(|e| format!("build failed: {e}"))?;
    println!("Building index for dir={} (alive={alive})", dir.display());
    collection
        .build_index()
        .and_then(|()| collection.save())
        .map_err(|e| format!("build failed: {e}"))?;
    println!("Index built and saved.");
    Ok(())
}

fn parse_query_line(line: &str, dim: usize, force_id: bool) -> Result<Vec<f32>, String> {
    let options = csv::CsvOptions {
        has_id: force_id,
        infer_id: !force_id,
        ..csv::CsvOptions::default()
    };
    // a leading id on --query lines is parsed and ignored
    let row = csv::parse_line(line, dim, &options)
        .map_err(|_| "search: failed to parse --query. Expect: f1,f2,...,f_dim".to_string())?;
    Ok(row.vec)
}

fn print_results(collection: &Collection, results: &[vecdb::SearchResult]) -> Result<(), String> {
    println!("Top{}:", results.len());
    for r in results {
        let id = collection
            .id_at(r.index)
            .map_err(|e| format!("search failed: {e}"))?
            .unwrap_or_default();
        println!("  index={} id={id} dist={:.6}", r.index, r.distance);
    }
    Ok(())
}

fn cmd_search(args: &Args) -> Result<(), String> {
    let dir = require_dir(args, "search")?;
    if !manifest_exists(&dir) {
        return Err(format!(
            "search: collection not found (manifest.json missing): {}",
            dir.display()
        ));
    }

    let k = get_usize_or(args, "--k", 10)?;
    let ef = get_usize_or(args, "--ef", 50)?;
    let force_id = has_flag(args, "--has-id");
    let filter = parse_filter(args).map_err(|e| format!("search: {e}"))?;

    let collection = Collection::open(&dir).map_err(|e| format!("search failed: {e}"))?;
    let dim = collection.dim().map_err(|e| format!("search failed: {e}"))?;

    let has_index = collection
        .has_index()
        .map_err(|e| format!("search failed: {e}"))?;
    if !has_index && filter.is_empty() {
        return Err(format!(
            "search: index not found. Run: vecdb build --dir {}",
            dir.display()
        ));
    }

    let query_line = get_kv(args, "--query");
    let query_csv = get_kv(args, "--query_csv");
    if query_line.is_none() && query_csv.is_none() {
        return Err("search: missing --query or --query_csv".into());
    }

    if let Some(line) = query_line {
        let q = parse_query_line(line, dim, force_id)?;
        let results = collection
            .search_filtered(&q, k, ef, &filter)
            .map_err(|e| format!("search failed: {e}"))?;

        print!("Query=");
        print_vec(&q);
        println!();
        return print_results(&collection, &results);
    }

    let limit = get_usize_or(args, "--limit", usize::MAX)?;
    let options = csv::CsvOptions {
        has_header: has_flag(args, "--header"),
        has_id: force_id,
        infer_id: !force_id,
        ..csv::CsvOptions::default()
    };

    let mut count = 0usize;
    let mut inner_err: Option<String> = None;
    csv::for_each_row(Path::new(query_csv.unwrap()), dim, &options, |row| {
        if count >= limit {
            return Ok(false);
        }
        let results = collection.search_filtered(&row.vec, k, ef, &filter)?;

        print!("\nQuery#{count}");
        if let Some(id) = &row.id {
            print!(" id={id}");
        }
        print!(" q=");
        print_vec(&row.vec);
        println!();
        if let Err(e) = print_results(&collection, &results) {
            inner_err = Some(e);
            return Ok(false);
        }
        count += 1;
        Ok(true)
    })
    .map_err(|e| format!("search query_csv failed: {e}"))?;

    inner_err.map_or(Ok(()), Err)
}

fn cmd_stats(args: &Args) -> Result<(), String> {
    let dir = require_dir(args, "stats")?;
    if !manifest_exists(&dir) {
        return Err(format!(
            "stats: collection not found (manifest.json missing): {}",
            dir.display()
        ));
    }

    let collection = Collection::open(&dir).map_err(|e| format!("stats failed: {e}"))?;
    let report = || -> vecdb::Result<()> {
        println!("Collection dir: {}", collection.dir().display());
        println!("dim: {}", collection.dim()?);
        println!("metric: {}", metric_name(collection.metric()?));
        println!("size(slots): {}", collection.len()?);
        println!("alive: {}", collection.alive_count()?);
        println!("has_index: {}", collection.has_index()?);
        Ok(())
    };
    report().map_err(|e| format!("stats failed: {e}"))
}

// ---------------- Demo / benchmark ----------------

struct DemoRng {
    state: u64,
}

impl DemoRng {
    const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x853c_49e6_748f_ea9b } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_vec(&mut self, dim: usize) -> Vec<f32> {
        (0..dim)
            .map(|_| (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32 * 2.0 - 1.0)
            .collect()
    }
}

fn demo_distance_checks() {
    use vecdb::distance;

    let a = [1.0f32, 0.0];
    let b = [2.0f32, 0.0];
    let c = [0.0f32, 1.0];

    println!("\nDistance sanity checks:");
    println!(
        "L2^2(a,b) = {}  (expected 1)",
        distance::distance(Metric::L2, &a, &b)
    );
    println!(
        "L2^2(a,c) = {}  (expected 2)",
        distance::distance(Metric::L2, &a, &c)
    );
    println!(
        "cosDist(a,b) = {}  (expected 0, same direction)",
        distance::distance(Metric::Cosine, &a, &b)
    );
    println!(
        "cosDist(a,c) = {}  (expected 1, orthogonal)",
        distance::distance(Metric::Cosine, &a, &c)
    );

    let mut x = [3.0f32, 4.0];
    distance::normalize_in_place(&mut x);
    print!("normalize([3,4]) = ");
    print_vec(&x);
    println!("  (expected [0.6,0.8])");
}

fn demo_recall_eval() -> Result<(), String> {
    let n = 2000;
    let dim = 16;
    let query_count = 30;
    let k = 10;
    let ef_list = [10usize, 20, 50, 100, 200];

    println!("\nEval harness demo (truth=bruteforce, approx=HNSW):");
    println!("N={n} dim={dim} queries={query_count} k={k}");

    let mut rng = DemoRng::new(123);
    let mut store = VectorStore::new(dim).map_err(|e| e.to_string())?;
    for i in 0..n {
        store
            .upsert(&format!("id_{i}"), &rng.next_vec(dim), None)
            .map_err(|e| e.to_string())?;
    }

    let queries: Vec<Vec<f32>> = (0..query_count).map(|_| rng.next_vec(dim)).collect();
    let truth: Vec<Vec<usize>> = queries
        .iter()
        .map(|q| {
            brute_force_top_k(&store, Metric::L2, q, k)
                .into_iter()
                .map(|r| r.index)
                .collect()
        })
        .collect();

    for use_diversity in [false, true] {
        let params = HnswConfig::default().with_diversity(use_diversity);
        let mut index = HnswIndex::new(Metric::L2, params);
        for i in 0..store.len() {
            index.insert(&store, i);
        }

        println!(
            "\nDiversity {}:",
            if use_diversity { "ON" } else { "OFF" }
        );
        println!("{:<15}{:<15}{:<18}", "ef_search", "recall@k", "avg_latency_ms");

        for &ef in &ef_list {
            let start = Instant::now();
            let mut hits = 0usize;
            let mut total = 0usize;
            for (q, t) in queries.iter().zip(truth.iter()) {
                let approx = index.search(&store, q, k, ef).map_err(|e| e.to_string())?;
                hits += approx.iter().filter(|r| t.contains(&r.index)).count();
                total += t.len();
            }
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0 / query_count as f64;
            let recall = hits as f64 / total as f64;
            println!("{ef:<15}{recall:<15.6}{elapsed_ms:<18.6}");
        }
    }
    Ok(())
}

fn demo_persistence() -> Result<(), String> {
    println!("\nPersistence demo:");

    let dir = std::env::temp_dir().join(format!("vecdb_demo_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);

    let options = CollectionOptions::new(4).with_metric(Metric::L2);
    let collection = Collection::create(&dir, options).map_err(|e| e.to_string())?;

    collection
        .upsert("u1", &[1.0, 0.0, 0.0, 0.0])
        .and_then(|_| collection.upsert("u2", &[0.0, 1.0, 0.0, 0.0]))
        .and_then(|_| collection.upsert("u3", &[0.0, 0.0, 1.0, 0.0]))
        .and_then(|_| {
            collection
                .upsert_with_metadata("u4", &[0.0, 0.0, 0.0, 1.0], demo_meta())
        })
        .map_err(|e| e.to_string())?;

    collection
        .build_index()
        .and_then(|()| collection.save())
        .map_err(|e| e.to_string())?;

    let reopened = Collection::open(&dir).map_err(|e| e.to_string())?;
    let q = [0.9f32, 0.1, 0.0, 0.0];
    let results = reopened.search(&q, 3, 50).map_err(|e| e.to_string())?;

    print!("Reloaded collection search q=");
    print_vec(&q);
    println!();
    println!("Top{}:", results.len());
    for r in &results {
        let id = reopened
            .id_at(r.index)
            .map_err(|e| e.to_string())?
            .unwrap_or_default();
        println!("  index={} id={id} dist={:.6}", r.index, r.distance);
    }

    let _ = std::fs::remove_dir_all(&dir);
    Ok(())
}

fn demo_meta() -> Metadata {
    [("kind".to_string(), "basis".to_string())].into()
}

fn cmd_demo() -> Result<(), String> {
    println!("VecDB demo starting...");
    demo_distance_checks();
    demo_recall_eval()?;
    demo_persistence()
}

fn print_help() {
    println!(
        r"VecDB CLI

USAGE:
  vecdb <command> [options]

COMMANDS:
  create   Create a new collection (writes manifest/store)
  load     Load vectors from CSV into an existing collection
  build    Build HNSW index and persist it
  search   Search topK for a query (or query CSV)
  stats    Print collection info
  demo     Run built-in demo/benchmark/persistence
  help     Print this help message

CSV FORMATS:
  vectors.csv: id,f1,f2,...,f_dim
  queries.csv: f1,f2,...,f_dim   OR   id,f1,...,f_dim

COMMON OPTIONS:
  --dir <path>          Collection directory (e.g., data/mycol)
  --metric l2|cosine    Metric (default l2)
  --header              CSV has a header row (skip first row)
  --has-id              CSV first column is id (even if numeric)
  --meta                CSV has a trailing metadata column

create OPTIONS:
  --dim <n>             Vector dimension (required)
  --M <n>               HNSW M (default 16)
  --M0 <n>              HNSW M0 (default 32)
  --efC <n>             HNSW ef_construction (default 100)
  --diversity 0|1       Neighbor diversity heuristic (default 1)
  --seed <n>            RNG seed (default 123)
  --level_mult <f>      Level multiplier (default 1.0)

load OPTIONS:
  --csv <file>          vectors.csv path (required)
  --build 0|1           build index after load (default 0)
  --meta                vectors.csv has trailing metadata column

build OPTIONS:
  (same HNSW params as create; overrides manifest params before building)

search OPTIONS:
  --query <csvline>     Single query line: f1,f2,...,f_dim  (no id)
  --query_csv <file>    Query CSV file (multiple queries)
  --k <n>               TopK (default 10)
  --ef <n>              ef_search (default 50)
  --limit <n>           For query_csv, limit number of queries (default all)
  --filter k=v          Filter by metadata key/value (exact match)

EXAMPLES:
  vecdb create --dir data/demo --dim 768 --metric l2
  vecdb load   --dir data/demo --csv data/vectors.csv
  vecdb build  --dir data/demo --M 16 --M0 32 --efC 100 --diversity 1
  vecdb search --dir data/demo --query '0.1,0.2,0.3,...' --k 10 --ef 100
"
    );
}
