use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;
use std::{env, process};

use pangenome_abundance::db::ResultsParams;
use pangenome_abundance::{gfa, reads, report, utils};
use pangenome_abundance::{AbundanceReport, ClusterTable, GeneIndex, ResultsDb};

use getopts::Options;

use log::LevelFilter;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();

    // Parse arguments.
    let config = Config::new();

    // Prepare the output directory and the log.
    fs::create_dir_all(&config.out_dir).map_err(|x| x.to_string())?;
    init_logger(&config)?;
    log::info!("Graph: {}", config.graph_file.display());
    log::info!("Clusters: {}", config.cluster_file.display());
    log::info!("Alignments: {}", config.alignment_file.display());
    log::info!("Score threshold: {}", config.threshold);

    // Check if the outputs already exist.
    let stem = utils::file_stem(&config.alignment_file);
    let db_file = config.out_dir.join(format!("res_{}.db", stem));
    let csv_file = config.out_dir.join(format!("res_strainslevel_{}.csv", stem));
    for filename in [&db_file, &csv_file] {
        if utils::file_exists(filename) {
            if config.overwrite {
                log::warn!("Overwriting {}", filename.display());
                fs::remove_file(filename).map_err(|x| x.to_string())?;
            } else {
                return Err(format!("Output file {} already exists", filename.display()));
            }
        }
    }

    // Graph and genes.
    let phase_start = Instant::now();
    let graph = gfa::load_graph(&config.graph_file).map_err(|x| x.to_string())?;
    let clusters = ClusterTable::load(&config.cluster_file).map_err(|x| x.to_string())?;
    log::info!("Loaded {} clusters", clusters.len());
    let genes = GeneIndex::new(&graph, &clusters);
    log::info!("Graph parsing done in {}", utils::format_duration(phase_start.elapsed()));

    // Alignments.
    let phase_start = Instant::now();
    let reader = utils::open_file(&config.alignment_file).map_err(|x| x.to_string())?;
    let (reads, variants) = reads::collect_reads(reader, &graph, config.threshold).map_err(|x| x.to_string())?;
    log::info!("JSON parsing done in {}", utils::format_duration(phase_start.elapsed()));

    // Abundances.
    let phase_start = Instant::now();
    let report = AbundanceReport::new(&graph, &genes, &reads, &variants).map_err(|x| x.to_string())?;
    log::info!("Abundances computation done in {}", utils::format_duration(phase_start.elapsed()));

    // Results.
    report::write_strain_table_file(&report, &csv_file).map_err(|x| x.to_string())?;
    let params = ResultsParams {
        threshold: config.threshold,
        graph: config.graph_file.display().to_string(),
        clusters: config.cluster_file.display().to_string(),
        alignments: config.alignment_file.display().to_string(),
    };
    ResultsDb::create(&report, &params, &db_file).map_err(|x| x.to_string())?;

    // Statistics.
    let database = ResultsDb::open(&db_file).map_err(|x| x.to_string())?;
    log::info!(
        "The database contains {} genes and {} strains; {} unique, {} ambiguous, {} multi-mapped, and {} novel mates",
        database.genes(), database.strains(),
        database.unique(), database.ambiguous(), database.multi_mapped(), database.novel()
    );
    let size = database.file_size().unwrap_or(String::from("unknown"));
    log::info!("Final database size: {}", size);
    log::info!("Total time: {}", utils::format_duration(start_time.elapsed()));

    Ok(())
}

//-----------------------------------------------------------------------------

// Log records go to the log file and optionally to stderr.
struct LogWriter {
    file: File,
    stderr: bool,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        if self.stderr {
            io::stderr().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.stderr {
            io::stderr().flush()?;
        }
        Ok(())
    }
}

fn init_logger(config: &Config) -> Result<(), String> {
    let log_file = config.out_dir.join("logs.txt");
    let file = File::create(&log_file).map_err(|x| format!("Cannot create log file {}: {}", log_file.display(), x))?;
    let writer = LogWriter { file, stderr: config.verbose || config.debug };
    let level = if config.debug { LevelFilter::Debug } else { LevelFilter::Info };

    env_logger::Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(buf, "{} -- {} -- {}", buf.timestamp(), record.level(), record.args())
        })
        .target(env_logger::Target::Pipe(Box::new(writer)))
        .try_init()
        .map_err(|x| x.to_string())
}

//-----------------------------------------------------------------------------

struct Config {
    pub graph_file: PathBuf,
    pub cluster_file: PathBuf,
    pub alignment_file: PathBuf,
    pub out_dir: PathBuf,
    pub threshold: f64,
    pub verbose: bool,
    pub debug: bool,
    pub overwrite: bool,
}

impl Config {
    // Default threshold for the normalized alignment score.
    const THRESHOLD: f64 = 0.9;

    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();
        let header = format!("Usage: {} [options] -g graph.gfa -c clusters.json -o outdir alignments.json[.gz]", program);

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("g", "graph", "GFA file name (required)", "FILE");
        opts.optopt("c", "clusters", "cluster table in JSON format (required)", "FILE");
        opts.optopt("o", "output", "output directory (required)", "DIR");
        let threshold_desc = format!("threshold on the normalized alignment score (default: {})", Self::THRESHOLD);
        opts.optopt("t", "threshold", &threshold_desc, "FLOAT");
        opts.optflag("v", "verbose", "copy the log to stderr");
        opts.optflag("d", "debug", "log debug messages and copy the log to stderr");
        opts.optflag("", "overwrite", "overwrite the output files if they exist");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let required = |name: &str| -> PathBuf {
            if let Some(s) = matches.opt_str(name) {
                PathBuf::from(s)
            } else {
                eprint!("{}", opts.usage(&header));
                process::exit(1);
            }
        };
        let graph_file = required("g");
        let cluster_file = required("c");
        let out_dir = required("o");

        let alignment_file = if let Some(s) = matches.free.first() {
            PathBuf::from(s)
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        // Parameters.
        let mut threshold = Self::THRESHOLD;
        if let Some(s) = matches.opt_str("t") {
            match s.parse::<f64>() {
                Ok(value) if (0.0..=1.0).contains(&value) => threshold = value,
                _ => {
                    eprintln!("Invalid threshold: {} (must be in [0, 1])", s);
                    process::exit(1);
                }
            }
        }

        Config {
            graph_file, cluster_file, alignment_file, out_dir,
            threshold,
            verbose: matches.opt_present("v"),
            debug: matches.opt_present("d"),
            overwrite: matches.opt_present("overwrite"),
        }
    }
}

//-----------------------------------------------------------------------------
