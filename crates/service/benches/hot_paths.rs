use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use service::auth::SessionSigner;
use service::content::{sanitize_content, MAX_POST_CHARS};
use service::rate_limiter::ActionRateLimiter;

const ADDR: &str = "0xa11ce00000000000000000000000000000000001";

fn bench_session(c: &mut Criterion) {
    let signer = SessionSigner::new("bench-secret", chrono::Duration::hours(1));
    let token = signer.issue(ADDR).unwrap();
    c.bench_function("session_verify", |b| b.iter(|| signer.verify(black_box(&token)).unwrap()));
}

fn bench_sanitize(c: &mut Criterion) {
    let raw = "<p>gm <b>frens</b></p>\r\n\r\n\r\n\r\nwe are so back\u{7}".repeat(40);
    c.bench_function("sanitize_post", |b| b.iter(|| sanitize_content(black_box(&raw), MAX_POST_CHARS).unwrap()));
}

fn bench_rate_limiter(c: &mut Criterion) {
    let limiter = ActionRateLimiter::new(u32::MAX, Duration::from_secs(60), Duration::from_secs(30), true);
    let addrs: Vec<String> = (0..256).map(|i| format!("0x{:040x}", i)).collect();
    let mut i = 0usize;
    c.bench_function("rate_limit_check", |b| {
        b.iter(|| {
            i = (i + 1) % addrs.len();
            limiter.check(black_box(&addrs[i])).unwrap();
        })
    });
}

criterion_group!(benches, bench_session, bench_sanitize, bench_rate_limiter);
criterion_main!(benches);
