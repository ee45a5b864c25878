//! 📊 Normalizer throughput: how fast a week of charts becomes flat tables.
//!
//! Last.fm is the one to watch. Every track is a nested object that has to be
//! flattened field by field, while the CSV sources are a straight parse.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};

use chartload::classifier::SourceTag;
use chartload::normalizers::{NormalizeOptions, normalize_source};

fn lastfm_payload(tracks: usize) -> String {
    let body: Vec<String> = (0..tracks)
        .map(|rank| {
            format!(
                r##"{{"name":"Song {rank}","duration":"200","listeners":"1000","mbid":"","url":"https://www.last.fm/music/a/_/s{rank}",
                "artist":{{"name":"Artist {rank}","mbid":"m{rank}","url":"https://www.last.fm/music/a{rank}"}},
                "@attr":{{"rank":"{rank}"}},
                "streamable":{{"#text":"0","fulltrack":"0"}},
                "image":[{{"#text":"","size":"small"}}]}}"##
            )
        })
        .collect();
    format!(r#"{{"tracks":{{"track":[{}]}}}}"#, body.join(","))
}

fn shazam_payload(rows: usize) -> String {
    let mut csv = String::from("Rank,Artist,Title\n");
    for rank in 1..=rows {
        csv.push_str(&format!("{rank},\"Artist {rank}, feat. Someone\",Song {rank}\n"));
    }
    csv
}

fn normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for count in [200, 2_000] {
        group.throughput(Throughput::Elements(count as u64));

        let lastfm = vec![("2024/1/8/lastfm_2024-01-08.json".to_string(), lastfm_payload(count))];
        group.bench_with_input(BenchmarkId::new("lastfm", count), &lastfm, |b, files| {
            b.iter(|| normalize_source(SourceTag::LastFm, files, NormalizeOptions::default()))
        });

        let shazam = vec![("2024/1/8/shazam_2024-01-08.csv".to_string(), shazam_payload(count))];
        group.bench_with_input(BenchmarkId::new("shazam", count), &shazam, |b, files| {
            b.iter(|| normalize_source(SourceTag::Shazam, files, NormalizeOptions::default()))
        });
    }

    group.finish();
}

criterion_group!(benches, normalize);
criterion_main!(benches);
