//! Seed-driven fixture scenarios pinning the public behaviour of every
//! form generator.

use organum_forms::chorale::{generate_chorale_prelude, ChoraleConfig};
use organum_forms::fantasia::{generate_fantasia, FantasiaConfig};
use organum_forms::passacaglia::{
    generate_ground_bass, generate_passacaglia, PassacagliaConfig,
};
use organum_forms::prelude::{generate_prelude, PreludeConfig, PreludeType};
use organum_forms::trio::{generate_trio_sonata, TrioSonataConfig};
use organum_score::{gm_program, NoteSource};
use organum_theory::{KeySignature, PitchClass};
use organum_time::{duration::WHOLE_NOTE, Tick, TICKS_PER_BAR};

fn pc(v: u8) -> PitchClass {
    PitchClass::new(v)
}

// ---------------------------------------------------------------------
// S1: chorale prelude track layout in C major, seed 42
// ---------------------------------------------------------------------

#[test]
fn s1_chorale_prelude_track_layout() {
    let config = ChoraleConfig {
        key: KeySignature::major(pc(0)),
        seed: 42,
        ..ChoraleConfig::default()
    };
    let output = generate_chorale_prelude(&config).expect("generates");

    assert_eq!(output.tracks.len(), 4);
    let channels: Vec<u8> = output.tracks.iter().map(|t| t.channel).collect();
    assert_eq!(channels, vec![0, 1, 0, 3]);

    let programs: Vec<u8> = output.tracks.iter().map(|t| t.program).collect();
    assert_eq!(
        programs,
        vec![
            gm_program::CHURCH_ORGAN,
            gm_program::REED_ORGAN,
            gm_program::CHURCH_ORGAN,
            gm_program::CHURCH_ORGAN,
        ]
    );

    let names: Vec<&str> = output.tracks.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["Counterpoint (Great)", "Cantus Firmus (Swell)", "Inner Voice (Great)", "Pedal"]
    );

    let cantus_total: Tick = output.tracks[1].notes.iter().map(|n| n.duration).sum();
    assert_eq!(output.total_duration_ticks, cantus_total);
}

// ---------------------------------------------------------------------
// S2: cantus selection cycles by seed mod 3
// ---------------------------------------------------------------------

#[test]
fn s2_cantus_selection_cycles_by_seed() {
    let durations: Vec<Tick> = (0..4u32)
        .map(|seed| {
            generate_chorale_prelude(&ChoraleConfig { seed, ..ChoraleConfig::default() })
                .expect("generates")
                .total_duration_ticks
        })
        .collect();

    assert_eq!(durations[0], durations[3]);
    let distinct = durations[0] != durations[1] || durations[1] != durations[2];
    assert!(distinct, "all three chorales came out the same length");
}

// ---------------------------------------------------------------------
// S3: passacaglia ground-bass periodicity
// ---------------------------------------------------------------------

#[test]
fn s3_ground_bass_repeats_across_every_variation() {
    let config = PassacagliaConfig {
        key: KeySignature::minor(pc(0)),
        seed: 42,
        num_variations: 12,
        ground_bass_bars: 8,
        num_voices: 4,
        ..PassacagliaConfig::default()
    };
    let output = generate_passacaglia(&config).expect("generates");

    assert_eq!(output.tracks.len(), 4);
    let pedal = &output.tracks[3].notes;
    let ground: Vec<_> =
        pedal.iter().filter(|n| n.source == NoteSource::GroundBass).collect();
    assert_eq!(ground.len(), 96);
    assert_eq!(pedal.len(), 96);

    for variation in 1..12usize {
        for idx in 0..8usize {
            assert_eq!(
                pedal[variation * 8 + idx].pitch,
                pedal[idx].pitch,
                "variation {variation}, note {idx}"
            );
            // Pitch classes repeat because the pitches themselves do.
            assert_eq!(
                pedal[variation * 8 + idx].pitch.class(),
                pedal[idx].pitch.class()
            );
        }
    }
}

// ---------------------------------------------------------------------
// S4: fantasia texture profile
// ---------------------------------------------------------------------

#[test]
fn s4_fantasia_texture_profile() {
    let config = FantasiaConfig {
        key: KeySignature::minor(pc(7)),
        seed: 42,
        num_voices: 4,
        section_bars: 32,
        ..FantasiaConfig::default()
    };
    let output = generate_fantasia(&config).expect("generates");

    assert_eq!(output.tracks.len(), 4);
    let channels: Vec<u8> = output.tracks.iter().map(|t| t.channel).collect();
    assert_eq!(channels, vec![0, 1, 2, 3]);
    assert_eq!(output.total_duration_ticks, 32 * TICKS_PER_BAR);

    let pad = &output.tracks[1].notes;
    let long_pad = pad.iter().filter(|n| n.duration >= 960).count() as f64;
    assert!(
        long_pad / pad.len() as f64 >= 0.70,
        "pad long-note share {}",
        long_pad / pad.len() as f64
    );

    let melody = &output.tracks[0].notes;
    let short_melody = melody.iter().filter(|n| n.duration <= 480).count() as f64;
    assert!(
        short_melody / melody.len() as f64 >= 0.80,
        "melody short-note share {}",
        short_melody / melody.len() as f64
    );
}

// ---------------------------------------------------------------------
// S5: perpetual prelude length and motion profile
// ---------------------------------------------------------------------

fn stepwise_ratio(notes: &[organum_score::NoteEvent]) -> f64 {
    if notes.len() < 2 {
        return 1.0;
    }
    let stepwise = notes
        .windows(2)
        .filter(|pair| pair[1].pitch.interval_from(pair[0].pitch).abs() <= 2)
        .count();
    stepwise as f64 / (notes.len() - 1) as f64
}

#[test]
fn s5_perpetual_prelude_profile() {
    let config = PreludeConfig {
        key: KeySignature::major(pc(0)),
        prelude_type: PreludeType::Perpetual,
        num_voices: 3,
        seed: 42,
        fugue_length_ticks: 0,
        ..PreludeConfig::default()
    };
    let output = generate_prelude(&config).expect("generates");

    assert_eq!(output.total_duration_ticks, 12 * TICKS_PER_BAR);
    assert!(output.tracks[0].notes.len() > output.tracks[1].notes.len());

    let ratio = stepwise_ratio(&output.tracks[0].notes);
    assert!((0.30..=0.95).contains(&ratio), "stepwise ratio {ratio}");
}

// ---------------------------------------------------------------------
// S6: trio sonata movement plan
// ---------------------------------------------------------------------

#[test]
fn s6_trio_sonata_movement_plan() {
    let config = TrioSonataConfig {
        key: KeySignature::major(pc(0)),
        seed: 42,
        bpm_fast: 120,
        bpm_slow: 60,
        ..TrioSonataConfig::default()
    };
    let output = generate_trio_sonata(&config).expect("generates");

    assert_eq!(output.movements.len(), 3);
    for movement in &output.movements {
        assert_eq!(movement.tracks.len(), 3);
        let channels: Vec<u8> = movement.tracks.iter().map(|t| t.channel).collect();
        assert_eq!(channels, vec![0, 1, 3]);
        let programs: Vec<u8> = movement.tracks.iter().map(|t| t.program).collect();
        assert_eq!(
            programs,
            vec![gm_program::CHURCH_ORGAN, gm_program::REED_ORGAN, gm_program::CHURCH_ORGAN]
        );
    }

    let bpms: Vec<u16> = output.movements.iter().map(|m| m.bpm).collect();
    assert_eq!(bpms, vec![120, 60, 120]);
    assert_eq!(output.movements[1].key, config.key.relative());
}

// ---------------------------------------------------------------------
// S7: ground bass alone
// ---------------------------------------------------------------------

#[test]
fn s7_ground_bass_shape() {
    for (key, seed) in [
        (KeySignature::minor(pc(0)), 1u32),
        (KeySignature::major(pc(7)), 99),
        (KeySignature::minor(pc(4)), 123_456),
    ] {
        let notes = generate_ground_bass(key, 8, seed);
        assert_eq!(notes.len(), 8);
        for note in &notes {
            assert_eq!(note.duration, WHOLE_NOTE);
            assert!(note.pitch.midi() >= 24 && note.pitch.midi() <= 50);
        }
        assert_eq!(notes[0].pitch.class(), key.tonic);
        assert_eq!(notes[7].pitch.class(), key.tonic);
        for pair in notes[..7].windows(2) {
            assert!(
                pair[1].pitch.distance_to(pair[0].pitch) <= 9,
                "interior leap in {key:?}"
            );
        }
        assert!(notes[7].pitch.distance_to(notes[6].pitch) <= 12);
    }
}
