use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use mu_xml::{Stream, StreamFlags, XmlEvent, XmlReader};
use quick_xml::events::Event;
use quick_xml::reader::Reader as QuickReader;

const WARMUP_ITERS: usize = 2;
const MEASURE_ITERS: usize = 10;

struct TrackingAllocator;

static CURRENT_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);
static PEAK_ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

#[global_allocator]
static GLOBAL_ALLOCATOR: TrackingAllocator = TrackingAllocator;

unsafe impl GlobalAlloc for TrackingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = unsafe { System.alloc(layout) };
        if !ptr.is_null() {
            let current = CURRENT_ALLOC_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
            PEAK_ALLOC_BYTES.fetch_max(current + layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) };
        CURRENT_ALLOC_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }
}

#[derive(Clone, Debug)]
struct CaseResult {
    fixture: &'static str,
    case: &'static str,
    median_ns: u128,
    p90_ns: u128,
    median_peak_heap_bytes: usize,
}

fn catalog(items: usize) -> Vec<u8> {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<catalog>\n");
    for i in 0..items {
        doc.push_str(&format!(
            "  <book id=\"b{i}\" lang='en'><title>Title {i}</title><!-- note {i} -->",
        ));
        doc.push_str("<summary><![CDATA[a < b && c > d]]></summary></book>\n");
    }
    doc.push_str("  <last/>\n</catalog>\n");
    doc.into_bytes()
}

fn count_events(stream: &mut Stream<'_>) -> usize {
    let mut reader = XmlReader::open(stream);
    let mut count = 0;
    while reader.has_next() {
        if reader.event() == XmlEvent::ElementBegin {
            count += reader.attribute_count();
        }
        count += 1;
        reader.advance();
    }
    count
}

fn percentile<T: Copy>(sorted: &[T], percentile: f64) -> T {
    let idx = ((sorted.len().saturating_sub(1) as f64) * percentile).round() as usize;
    sorted[idx]
}

fn run_case<F>(fixture: &'static str, case: &'static str, mut op: F) -> CaseResult
where
    F: FnMut() -> usize,
{
    for _ in 0..WARMUP_ITERS {
        black_box(op());
    }

    let mut samples = Vec::with_capacity(MEASURE_ITERS);
    let mut mem_samples = Vec::with_capacity(MEASURE_ITERS);
    for _ in 0..MEASURE_ITERS {
        let baseline = CURRENT_ALLOC_BYTES.load(Ordering::Relaxed);
        PEAK_ALLOC_BYTES.store(baseline, Ordering::Relaxed);
        let start = Instant::now();
        black_box(op());
        samples.push(start.elapsed().as_nanos());
        mem_samples.push(PEAK_ALLOC_BYTES.load(Ordering::Relaxed).saturating_sub(baseline));
    }
    samples.sort_unstable();
    mem_samples.sort_unstable();

    CaseResult {
        fixture,
        case,
        median_ns: percentile(&samples, 0.5),
        p90_ns: percentile(&samples, 0.9),
        median_peak_heap_bytes: percentile(&mem_samples, 0.5),
    }
}

fn main() {
    println!("# mu-xml benchmark");
    println!(
        "# warmup_iters={}, measure_iters={}",
        WARMUP_ITERS, MEASURE_ITERS
    );

    let fixtures: [(&'static str, Vec<u8>); 2] =
        [("catalog-1k", catalog(1_000)), ("catalog-20k", catalog(20_000))];
    let mut results = Vec::new();

    for (key, doc) in &fixtures {
        let packed = miniz_oxide::deflate::compress_to_vec_zlib(doc, 6);

        results.push(run_case(key, "mu-xml/events", || {
            let mut stream =
                Stream::from_memory(doc, StreamFlags::READ_ONLY).expect("open failed");
            count_events(&mut stream)
        }));

        results.push(run_case(key, "mu-xml/compressed_events", || {
            let mut stream =
                Stream::from_memory(&packed, StreamFlags::READ_ONLY | StreamFlags::COMPRESSED)
                    .expect("open failed");
            count_events(&mut stream)
        }));

        results.push(run_case(key, "mu-xml/seek_last", || {
            let mut stream =
                Stream::from_memory(doc, StreamFlags::READ_ONLY).expect("open failed");
            let mut reader = XmlReader::open(&mut stream);
            usize::from(reader.seek("/catalog/last"))
        }));

        results.push(run_case(key, "compare/quick-xml/events", || {
            let mut reader = QuickReader::from_reader(doc.as_slice());
            let mut buf = Vec::new();
            let mut count = 0;
            loop {
                match reader.read_event_into(&mut buf) {
                    Ok(Event::Eof) => break,
                    Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                        count += 1 + e.attributes().count();
                    }
                    Ok(_) => count += 1,
                    Err(err) => panic!("quick-xml failed: {}", err),
                }
                buf.clear();
            }
            count
        }));
    }

    println!("fixture,case,median_ns,p90_ns,median_peak_heap_bytes");
    for result in &results {
        println!(
            "{},{},{},{},{}",
            result.fixture,
            result.case,
            result.median_ns,
            result.p90_ns,
            result.median_peak_heap_bytes
        );
    }
}
