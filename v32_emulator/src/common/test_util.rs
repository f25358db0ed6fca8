#![cfg(test)]

use std::path::Path;

use hound::WavReader;
use hound::WavWriter;

pub fn compare_wav_against_golden(data: &[(f32, f32)], path_prefix: &Path) {
    let golden_path = path_prefix.with_extension("wav");
    if golden_path.exists() {
        let golden = read_stereo_wav(&golden_path);
        if quantize(data) != golden {
            let actual_path = path_prefix.with_extension("actual.wav");
            write_stereo_wav(data, &actual_path);
            panic!("Actual result does not match golden. See {:?}", actual_path);
        }
    } else {
        write_stereo_wav(data, &golden_path);
    }
}

pub fn write_stereo_wav(data: &[(f32, f32)], filename: &Path) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(filename, spec).unwrap();
    for (left, right) in quantize(data) {
        writer.write_sample(left).unwrap();
        writer.write_sample(right).unwrap();
    }
    writer.finalize().unwrap()
}

pub fn read_stereo_wav(filename: &Path) -> Vec<(i16, i16)> {
    let mut reader = WavReader::open(filename).unwrap();
    let samples: Vec<i16> = reader.samples().map(|s| s.unwrap()).collect();
    samples.chunks(2).map(|pair| (pair[0], pair[1])).collect()
}

fn quantize(data: &[(f32, f32)]) -> Vec<(i16, i16)> {
    data.iter()
        .map(|(l, r)| {
            (
                (l.clamp(-1.0, 1.0) * i16::MAX as f32) as i16,
                (r.clamp(-1.0, 1.0) * i16::MAX as f32) as i16,
            )
        })
        .collect()
}
