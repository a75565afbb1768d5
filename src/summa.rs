use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::ThreadPoolBuilder;

use crate::canon::Canonicalizer;
use crate::error::SummaError;
use crate::frontier::Frontier;
use crate::report::render_solution;
use crate::search::{NodeBudget, SearchThread};
use crate::solution::{Constituent, Solution, Total, validate_domain};

/// Subtrees prepared per worker, so uneven subtree sizes still balance.
const FRAMES_PER_WORKER: usize = 8;

/// Outcome of one run. `complete` is false only when the node budget ran
/// out before the search space was covered.
#[derive(Debug, Clone, Copy)]
pub struct SolveSummary {
    pub found: u64,
    pub complete: bool,
}

/// The engine driver: validates the inputs, splits the search space into
/// frames, fans them out to a worker pool, and funnels every raw solution
/// into a single collector thread that owns deduplication and the output
/// file.
pub struct Summa {
    // Constructor arguments
    values: Vec<f64>,
    targets: Vec<f64>,
    output_file_name: String,
    tolerance: f64,
    precision: usize,
    num_threads: u64,
    max_nodes: Option<u64>,

    // Processed variables
    constituents: Vec<Constituent>,
    totals: Vec<Total>,

    explored_frames: Arc<AtomicU64>, //⚛️Progress index, counts finished search frames
}

impl Summa {
    // Constructor
    pub fn new() -> Self {
        Self {
            values: Vec::new(),
            targets: Vec::new(),
            output_file_name: String::new(),
            tolerance: 1e-4,
            precision: 2,
            num_threads: num_cpus::get() as u64,
            max_nodes: None,

            constituents: Vec::new(),
            totals: Vec::new(),

            explored_frames: Arc::new(AtomicU64::new(0)), //⚛️
        }
    }

    /// Sets the run options.
    pub fn set_options(
        &mut self,
        values: &[f64],
        targets: &[f64],
        output_file_name: &str,
        tolerance: f64,
        precision: usize,
        num_threads: u64,
        max_nodes: Option<u64>,
    ) -> Result<(), SummaError> {
        self.set_inputs(values, targets)?;
        self.tolerance = tolerance;
        self.precision = precision;
        self.num_threads = num_threads;
        self.max_nodes = max_nodes;
        self.output_file_name = output_file_name.to_string();
        Ok(())
    }

    /// Sets the constituent values and the target totals. Negative inputs
    /// are rejected here, before any search runs.
    pub fn set_inputs(&mut self, values: &[f64], targets: &[f64]) -> Result<(), SummaError> {
        validate_domain(values, targets)?;

        self.values = values.to_vec();
        self.targets = targets.to_vec();
        self.constituents = Constituent::from_values(values);
        self.totals = Total::from_targets(targets);

        Ok(())
    }

    /// Runs the enumeration. Returns the number of distinct solutions
    /// written to the output file, plus the completeness flag.
    pub fn solve(&mut self) -> Result<SolveSummary, SummaError> {
        // Output settings
        self.print();

        // Reserve two threads: main + collector
        let workers_number = self.num_threads.saturating_sub(2).max(1);

        // Splits the search space into independent subtrees
        let frontier = Frontier::new(
            &self.constituents,
            &self.totals,
            self.tolerance,
            workers_number as usize * FRAMES_PER_WORKER,
        );
        let frames_number = frontier.frames_number();

        println!("[*] Starting {} search threads", workers_number);
        println!("[*] Covering {} search frames\n", frames_number);

        // Prepare the Arcs to share with workers and the collector
        let constituents_arc = Arc::new(self.constituents.clone());
        let totals_arc = Arc::new(self.totals.clone());
        let suffix_sums_arc = Arc::new(SearchThread::suffix_sums(&self.values));
        let budget = self.max_nodes.map(|cap| Arc::new(NodeBudget::new(cap)));

        // Build a rayon thread pool with the desired number of worker threads
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers_number as usize)
            .build()
            .map_err(|e| SummaError::Thread(format!("Failed to build thread pool: {}", e)))?;

        // Create the crossbeam channel (unbounded). Producers will be clones of sender
        let (sender, receiver): (Sender<Solution>, Receiver<Solution>) = unbounded();

        // Spawn the collector thread: the single owner of the seen-key set
        // and the output file
        let of = self.output_file_name.clone();
        let progress_clone = self.explored_frames.clone();
        let collector_constituents = Arc::clone(&constituents_arc);
        let collector_totals = Arc::clone(&totals_arc);
        let precision = self.precision;
        let collector_handle = thread::spawn(move || {
            Self::collector_loop(
                receiver,
                of,
                collector_constituents,
                collector_totals,
                precision,
                progress_clone,
                frames_number,
            )
        });

        let timer_start = Instant::now();

        // Scope the work so we block until all tasks are done.
        pool.scope(|s| {
            for i in 0..frames_number {
                let frame = frontier.frame(i).clone();

                // Clone arcs & sender for move into task
                let constituents = Arc::clone(&constituents_arc);
                let totals = Arc::clone(&totals_arc);
                let suffix_sums = Arc::clone(&suffix_sums_arc);
                let task_budget = budget.clone();
                let task_sender = sender.clone();
                let explored_frames_clone = self.explored_frames.clone();
                let tolerance = self.tolerance;

                s.spawn(move |_| {
                    let mut search_thread = SearchThread::new(
                        constituents,
                        totals,
                        suffix_sums,
                        tolerance,
                        task_budget,
                        task_sender,
                    );
                    search_thread.run(&frame);
                    explored_frames_clone.fetch_add(1, Ordering::Relaxed);
                });
            }
            // When the scope ends, all spawned tasks are guaranteed to have completed,
            // and their clones of `sender` will be dropped.
        });

        let elapsed = Instant::now().duration_since(timer_start);
        println!("\n\n[*] Search time: {:.2?}", elapsed);

        drop(sender); // Drop the first sender to avoid deadlock

        // Join the collector thread
        let thread_result = collector_handle.join();

        let found = match thread_result {
            // Collector completed without panic, but might have returned an Err<io::Error>
            Ok(io_res) => {
                io_res.map_err(|e| SummaError::Thread(format!("Collector thread error: {}", e)))?
            }

            // Collector panicked (JoinHandle::join returns Err)
            Err(e) => {
                if let Some(panic_msg) = e.downcast_ref::<&str>() {
                    return Err(SummaError::Thread(format!(
                        "Collector thread panicked: {}",
                        panic_msg
                    )));
                } else if let Some(panic_msg) = e.downcast_ref::<String>() {
                    return Err(SummaError::Thread(format!(
                        "Collector thread panicked: {}",
                        panic_msg
                    )));
                } else {
                    return Err(SummaError::Thread(
                        "Collector thread panicked with unknown type.".to_string(),
                    ));
                }
            }
        };

        let complete = budget.map_or(true, |b| !b.exhausted());
        if !complete {
            println!("[!] Node budget exhausted, the solution set may be incomplete");
        }

        Ok(SolveSummary { found, complete })
    }

    /// Consumes raw solutions from the receiver, dedups them, and writes the
    /// rendered survivors to file. Returns the distinct count or an IO error.
    fn collector_loop(
        receiver: Receiver<Solution>,
        output_file_name: String,
        constituents: Arc<Vec<Constituent>>,
        totals: Arc<Vec<Total>>,
        precision: usize,
        explored_frames: Arc<AtomicU64>,
        frames_number: usize,
    ) -> Result<u64, std::io::Error> {
        let mut last_display_time = Instant::now();

        // Open output file
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&output_file_name)?;

        let mut writer = BufWriter::new(file);
        let mut canon = Canonicalizer::new();
        let mut solution_count: u64 = 0;

        for solution in receiver.iter() {
            if !canon.admit(&solution) {
                continue;
            }

            solution_count += 1;
            write!(
                writer,
                "{}",
                render_solution(solution_count, &solution, &constituents, &totals, precision)
            )?;

            // Update console every 1 second
            let now = Instant::now();
            if now.duration_since(last_display_time) >= Duration::from_millis(1000) {
                print!(
                    "\r[{}/{} frames] {} unique solution(s){}",
                    explored_frames.load(Ordering::Relaxed),
                    frames_number,
                    solution_count,
                    " ".repeat(30)
                );
                std::io::stdout().flush()?;
                writer.flush()?; //Flush periodically on file
                last_display_time = now;
            }
        }

        // Final flush after the channel is exhausted
        writer.flush()?;

        Ok(solution_count)
    }

    // Debug print function
    pub fn print(&self) {
        println!("\nSumma exhaustive totals-partition engine\n");

        println!("{:<40}{}", "[*] Constituents:", self.values.len());
        println!("{:<40}{:?}", "[*] Targets:", self.targets);
        println!("{:<40}{}", "[*] Tolerance:", self.tolerance);
        println!("{:<40}{}", "[*] Display precision:", self.precision);
        println!("{:<40}{}", "[*] Output file:", self.output_file_name);
        println!("{:<40}{}", "[*] Estimated concurrency:", num_cpus::get());
        println!("{:<40}{}", "[*] Threads to launch:", self.num_threads);
        match self.max_nodes {
            Some(cap) => println!("{:<40}{}", "[*] Node budget:", cap),
            None => println!("{:<40}{}", "[*] Node budget:", "<none>"),
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_solve_end_to_end() {
        let out = NamedTempFile::new().expect("Failed to create temp file");
        let path = out.path().to_str().unwrap().to_string();

        let mut sm = Summa::new();
        sm.set_options(
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &[12.0, 9.0],
            &path,
            1e-4,
            2,
            4,
            None,
        )
        .unwrap();

        let summary = sm.solve().unwrap();
        assert_eq!(summary.found, 5);
        assert!(summary.complete);

        let rendered = std::fs::read_to_string(&path).unwrap();
        assert_eq!(rendered.matches("Unique solution ").count(), 5);
        assert!(rendered.contains("Input total: 12.00"));
        assert!(rendered.contains("Input total: 9.00"));
    }

    #[test]
    fn test_solve_no_match_writes_nothing() {
        let out = NamedTempFile::new().unwrap();
        let path = out.path().to_str().unwrap().to_string();

        let mut sm = Summa::new();
        sm.set_options(&[1.0, 2.0], &[100.0], &path, 1e-4, 2, 2, None)
            .unwrap();

        let summary = sm.solve().unwrap();
        assert_eq!(summary.found, 0);
        assert!(summary.complete);
        assert!(std::fs::read_to_string(&path).unwrap().is_empty());
    }

    #[test]
    fn test_negative_inputs_are_rejected_before_the_search() {
        let mut sm = Summa::new();
        let err = sm.set_inputs(&[1.0, -1.0], &[2.0]).unwrap_err();
        assert!(matches!(err, SummaError::NegativeConstituent { .. }));
    }
}
