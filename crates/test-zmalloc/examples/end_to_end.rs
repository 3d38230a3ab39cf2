fn main() {
    println!("lib: {}", zmalloc::ZMALLOC_LIB);
    println!("start: {}", zmalloc::used_memory());

    let p1 = zmalloc::zmalloc(10);
    let p2 = zmalloc::zcalloc(20);
    println!("allocated: {}", zmalloc::used_memory());

    let zeroed = unsafe { std::slice::from_raw_parts(p2.as_ptr(), 20) };
    assert!(zeroed.iter().all(|&b| b == 0));

    unsafe {
        zmalloc::zfree(p1.as_ptr());
        zmalloc::zfree(p2.as_ptr());
        zmalloc::zfree(std::ptr::null_mut());
    }
    println!("freed: {}", zmalloc::used_memory());
}
