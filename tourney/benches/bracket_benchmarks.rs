use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use tourney::{
    BracketFormat, BracketLayout,
    bracket::{Match, MatchResult, TeamId, advance, compute_progress, progression::record_result},
    leaderboard::tally_bracket,
    recommend::{HistorySample, engine},
};

/// Helper to seed a bracket of `n` teams with ids assigned
fn seeded(format: BracketFormat, n: usize) -> (BracketLayout, Vec<Match>) {
    let layout = BracketLayout::build(format, n).unwrap();
    let teams: Vec<TeamId> = (1..=n as TeamId).collect();
    let mut matches = layout.seed(&teams).unwrap();
    for (i, m) in matches.iter_mut().enumerate() {
        m.id = i as i64 + 1;
    }
    advance(&layout, &mut matches).unwrap();
    (layout, matches)
}

/// Play every ready match with team1 winning
fn play_out(layout: &BracketLayout, matches: &mut [Match]) {
    while let Some(idx) = matches
        .iter()
        .position(|m| !m.is_completed() && m.has_both_teams())
    {
        let m = &mut matches[idx];
        let winner = m.team1_id.unwrap();
        record_result(
            m,
            &MatchResult {
                team1_score: 2,
                team2_score: 1,
                winner_team_id: winner,
            },
        )
        .unwrap();
        advance(layout, matches).unwrap();
    }
}

/// Benchmark layout construction for every format
fn bench_layout_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("layout_build");

    for format in BracketFormat::ALL {
        for teams in [8, 32, 128] {
            group.bench_with_input(
                BenchmarkId::new(format.to_string(), teams),
                &teams,
                |b, &n| {
                    b.iter(|| BracketLayout::build(format, n).unwrap());
                },
            );
        }
    }

    group.finish();
}

/// Benchmark a single progression pass over a freshly seeded bracket
fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance");

    for teams in [8, 33, 128] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_teams", teams)),
            &teams,
            |b, &n| {
                let (layout, matches) = seeded(BracketFormat::DoubleElimination, n);
                b.iter_batched(
                    || matches.clone(),
                    |mut matches| advance(&layout, &mut matches).unwrap(),
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

/// Benchmark progress and leaderboard derivation on finished brackets
fn bench_derivations(c: &mut Criterion) {
    let (layout, mut matches) = seeded(BracketFormat::DoubleElimination, 64);
    play_out(&layout, &mut matches);

    c.bench_function("compute_progress_de_64", |b| {
        b.iter(|| compute_progress(BracketFormat::DoubleElimination, 1, &matches));
    });

    c.bench_function("tally_bracket_de_64", |b| {
        b.iter(|| tally_bracket(BracketFormat::DoubleElimination, &matches).ranked());
    });
}

/// Benchmark recommendations against a full history window
fn bench_recommend(c: &mut Criterion) {
    let history: Vec<HistorySample> = (0..50)
        .map(|i| HistorySample {
            num_teams: 8 + i % 6,
            recommended_format: BracketFormat::ALL[i % 3],
            admin_choice: (i % 2 == 0).then_some(BracketFormat::RoundRobin),
        })
        .collect();

    c.bench_function("recommend_with_history", |b| {
        b.iter(|| engine::recommend(10, "basketball", &history));
    });
}

criterion_group!(brackets, bench_layout_build, bench_advance, bench_derivations);

criterion_group!(recommendations, bench_recommend);

criterion_main!(brackets, recommendations);
