use serde_json::json;

use corsascore_core::{
    normalize_activity, score_session, AthleteParameters, Distance, ElapsedTime, Insufficient, Normalized,
    Stream, StreamSet, StravaActivity,
};

fn run_activity() -> StravaActivity {
    serde_json::from_value(json!({
        "id": 987654321,
        "name": "Morning Run",
        "type": "Run",
        "start_date": "2024-05-01T05:30:00Z",
        "elapsed_time": 3600,
        "distance": 10000.0,
        "total_elevation_gain": 50.0
    }))
    .unwrap()
}

fn streams(time: usize, watts: usize, hr: usize) -> StreamSet {
    StreamSet {
        time: Some(Stream::from_values((0..time).map(|t| t as f64))),
        watts: Some(Stream::from_values(std::iter::repeat(200.0).take(watts))),
        heartrate: Some(Stream::from_values(std::iter::repeat(150.0).take(hr))),
    }
}

#[test]
fn unequal_streams_use_common_prefix() {
    let out = normalize_activity(&run_activity(), &streams(100, 95, 98));
    let session = out.into_session().expect("session");
    assert_eq!(session.power_samples.len(), 95);
    assert_eq!(session.beat_intervals_ms.len(), 94);
    assert!(session.beat_intervals_ms.iter().all(|r| (r - 400.0).abs() < 1e-9));
}

#[test]
fn header_comes_from_activity_summary() {
    let session = normalize_activity(&run_activity(), &streams(10, 10, 10)).into_session().unwrap();
    assert_eq!(session.header.timestamp.to_rfc3339(), "2024-05-01T05:30:00+00:00");
    assert_eq!(session.header.duration_s, 3600.0);
    assert_eq!(session.header.distance_m, 10_000.0);
    assert_eq!(session.header.ascent_m, 50.0);
}

#[test]
fn synthetic_intervals_average_adjacent_bpm() {
    let s = StreamSet {
        time: Some(Stream::from_values([0.0, 1.0, 2.0, 3.0])),
        watts: Some(Stream::from_values([200.0, 210.0, 220.0, 230.0])),
        heartrate: Some(Stream::from_values([100.0, 140.0, 160.0, 160.0])),
    };
    let session = normalize_activity(&run_activity(), &s).into_session().unwrap();
    let expected = [60_000.0 / 120.0, 60_000.0 / 150.0, 60_000.0 / 160.0];
    assert_eq!(session.beat_intervals_ms.len(), 3);
    for (got, want) in session.beat_intervals_ms.iter().zip(expected) {
        assert!((got - want).abs() < 1e-9, "{got} vs {want}");
    }
}

#[test]
fn only_runs_are_eligible() {
    let mut ride = run_activity();
    ride.activity_type = "Ride".to_string();
    assert_eq!(
        normalize_activity(&ride, &streams(10, 10, 10)),
        Normalized::Insufficient(Insufficient::NotARun)
    );
}

#[test]
fn missing_or_empty_streams_are_insufficient() {
    let mut s = streams(10, 10, 10);
    s.watts = None;
    assert_eq!(
        normalize_activity(&run_activity(), &s),
        Normalized::Insufficient(Insufficient::MissingStreams)
    );

    let mut s = streams(10, 10, 10);
    s.heartrate = Some(Stream::default());
    assert_eq!(
        normalize_activity(&run_activity(), &s),
        Normalized::Insufficient(Insufficient::MissingStreams)
    );
}

#[test]
fn single_hr_sample_gives_no_intervals() {
    assert_eq!(
        normalize_activity(&run_activity(), &streams(1, 1, 1)),
        Normalized::Insufficient(Insufficient::NoBeatIntervals)
    );
}

#[test]
fn elapsed_time_variants() {
    let cases = [
        (json!(3600), 3600.0),
        (json!(1800.5), 1800.5),
        (json!({ "total_seconds": 2700.0 }), 2700.0),
        (json!({ "total_seconds": 2700.0, "seconds": 12 }), 2700.0),
        (json!({ "seconds": 42 }), 42.0),
        (json!("an hour"), 0.0),
        (json!(null), 0.0),
    ];
    for (raw, want) in cases {
        let et: ElapsedTime = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(et.to_seconds(), want, "{raw}");
    }

    let mut v = serde_json::to_value(run_activity()).unwrap();
    v.as_object_mut().unwrap().remove("elapsed_time");
    let a: StravaActivity = serde_json::from_value(v).unwrap();
    assert_eq!(a.elapsed_time.to_seconds(), 0.0);
}

#[test]
fn distance_plain_or_quantity() {
    let d: Distance = serde_json::from_value(json!(5000.0)).unwrap();
    assert_eq!(d.meters(), 5000.0);
    let d: Distance = serde_json::from_value(json!({ "num": 7500.0, "unit": "m" })).unwrap();
    assert_eq!(d.meters(), 7500.0);
    let d: Distance = serde_json::from_value(json!({ "value": 1234.5 })).unwrap();
    assert_eq!(d.meters(), 1234.5);
}

#[test]
fn api_streams_payload_decodes_with_nulls() {
    let set: StreamSet = serde_json::from_value(json!({
        "time": { "data": [0, 1, 2, 3], "series_type": "distance", "original_size": 4, "resolution": "high" },
        "watts": { "data": [210, null, 230, 240] },
        "heartrate": { "data": [150, 150, 150, 150] }
    }))
    .unwrap();

    let session = normalize_activity(&run_activity(), &set).into_session().unwrap();
    assert_eq!(session.power_samples, vec![210.0, 230.0, 240.0]);
    assert_eq!(session.beat_intervals_ms.len(), 3);
}

#[test]
fn activity_session_scores() {
    let session = normalize_activity(&run_activity(), &streams(3600, 3600, 3600)).into_session().unwrap();
    let params = AthleteParameters { weight_kg: 70.0, hr_rest: 60, hr_max: 180, base_offset: 2.0 };
    let r = score_session(&session, &params).unwrap();
    assert_eq!(r.hr_avg_bpm, 150.0);
    assert_eq!(r.hrr_pct, 75.0);
    assert_eq!(r.decoupling_pct, 0.0);
    // 200 W * 1.005
    assert_eq!(r.watt_adjusted, 201.0);
}
