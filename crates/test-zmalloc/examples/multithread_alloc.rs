use std::thread;

const NUM_THREADS: usize = 14;
const ITERATIONS: usize = 10_000;

fn allocate_and_free(thread_id: usize) {
    let mut live = Vec::with_capacity(64);
    for i in 0..ITERATIONS {
        let size = (thread_id * 31 + i) % 2048;
        let ptr = if i % 2 == 0 {
            zmalloc::zmalloc(size)
        } else {
            zmalloc::zcalloc(size)
        };
        live.push(ptr);
        if live.len() == 64 {
            for ptr in live.drain(..) {
                unsafe { zmalloc::zfree(ptr.as_ptr()) };
            }
        }
    }
    for ptr in live {
        unsafe { zmalloc::zfree(ptr.as_ptr()) };
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|i| thread::spawn(move || allocate_and_free(i)))
        .collect();

    for handle in handles {
        handle.join().map_err(|_| "thread panicked")?;
    }

    println!("used_memory after join: {}", zmalloc::used_memory());

    Ok(())
}
