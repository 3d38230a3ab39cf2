#[global_allocator]
static GLOBAL: zmalloc::ZmallocGlobal = zmalloc::ZmallocGlobal;

#[repr(align(256))]
struct Page([u8; 256]);

fn main() {
    let before = zmalloc::used_memory();

    let data: Vec<u64> = (0..10_000).collect();
    let pages: Vec<Page> = (0..4).map(|_| Page([0; 256])).collect();
    let during = zmalloc::used_memory();
    assert!(during >= before + data.len() * 8 + pages.len() * 256);
    std::hint::black_box((&data, &pages));

    drop(data);
    drop(pages);
    let after = zmalloc::used_memory();

    println!("before: {before}");
    println!("during: {during}");
    println!("after: {after}");
    println!("balanced: {}", after == before);
}
