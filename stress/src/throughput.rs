use num_format::{Locale, ToFormattedString};
use std::{
    env,
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

const SLIDING_WINDOW_SIZE: u64 = 2; // In seconds

static STOP: AtomicBool = AtomicBool::new(false);

#[repr(C)]
struct WorkerStats {
    count: AtomicU64,
    /// Padding rounds each entry up to a cache line so workers never share one.
    padding: [u64; 15],
}

pub fn test_throughput<F>(func: F)
where
    F: Fn() + Sync + Send + 'static,
{
    ctrlc::set_handler(move || {
        STOP.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let mut num_threads = num_cpus::get_physical();

    // One core stays free for the monitor thread, so anything below two is ignored.
    if let Some(arg) = env::args().nth(1) {
        match arg.parse::<usize>() {
            Ok(n) if n >= 2 => num_threads = n,
            _ => eprintln!("Ignoring thread count '{}', using {}.", arg, num_threads),
        }
    }

    println!("Number of threads: {}\n", num_threads);
    let func_arc = Arc::new(func);
    let mut worker_stats_vec: Vec<WorkerStats> = Vec::new();

    for _ in 0..num_threads {
        worker_stats_vec.push(WorkerStats {
            count: AtomicU64::new(0),
            padding: [0; 15],
        });
    }
    let worker_stats_shared = Arc::new(worker_stats_vec);
    let worker_stats_shared_monitor = Arc::clone(&worker_stats_shared);

    let exit_flag = Arc::new(AtomicBool::new(false));
    let exit_flag_clone = Arc::clone(&exit_flag);

    let handle_main_thread = thread::spawn(move || {
        let mut start_time = Instant::now();
        let mut total_count_old: u64 = 0;

        loop {
            let elapsed = start_time.elapsed().as_secs();
            if elapsed >= SLIDING_WINDOW_SIZE {
                let total_count_u64: u64 = worker_stats_shared_monitor
                    .iter()
                    .map(|worker_stat| worker_stat.count.load(Ordering::Relaxed))
                    .sum();
                let current_count = total_count_u64 - total_count_old;
                total_count_old = total_count_u64;
                let throughput = current_count / elapsed;
                println!(
                    "Throughput: {} iterations/sec",
                    throughput.to_formatted_string(&Locale::en)
                );
                start_time = Instant::now();
            }

            if exit_flag_clone.load(Ordering::SeqCst) {
                break;
            }

            thread::sleep(Duration::from_millis(100));
        }
    });

    let mut handles = Vec::with_capacity(num_threads - 1);
    for thread_index in 0..num_threads - 1 {
        let worker_stats_shared = Arc::clone(&worker_stats_shared);
        let func_arc_clone = Arc::clone(&func_arc);
        let handle = thread::spawn(move || loop {
            for _ in 0..1000 {
                func_arc_clone();
            }
            worker_stats_shared[thread_index]
                .count
                .fetch_add(1000, Ordering::Relaxed);
            if STOP.load(Ordering::SeqCst) {
                break;
            }
        });
        handles.push(handle);
    }

    for handle in handles {
        handle.join().expect("worker thread panicked");
    }

    exit_flag.store(true, Ordering::SeqCst);
    handle_main_thread.join().expect("monitor thread panicked");
}
