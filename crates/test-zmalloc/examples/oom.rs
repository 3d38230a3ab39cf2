fn main() {
    println!("requesting {} bytes", usize::MAX);
    let ptr = zmalloc::zmalloc(usize::MAX);
    // unreachable: zmalloc aborts instead of returning
    println!("returned {:p}", ptr);
}
