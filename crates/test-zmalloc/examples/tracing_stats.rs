fn main() {
    tracing_subscriber::fmt().with_ansi(false).init();

    let ptr = zmalloc::zmalloc(1000);
    let stats = zmalloc::stats();
    stats.log();
    println!("{stats}");

    unsafe { zmalloc::zfree(ptr.as_ptr()) };
    tracing::info!(used_memory = zmalloc::used_memory(), "block freed");
    zmalloc::stats().log();
}
