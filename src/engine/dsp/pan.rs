/// Linear balance law: the far side fades out, the near side stays at unity.
///
/// `balance` is -1.0 (hard left) to 1.0 (hard right). Returns (left, right).
#[inline]
pub fn balance_gains(balance: f32) -> (f32, f32) {
    let b = balance.clamp(-1.0, 1.0);
    ((1.0 - b).min(1.0), (1.0 + b).min(1.0))
}

/// Appends interleaved stereo `input` to `out` laid out for `channels`
/// device channels. Mono devices get the average; extra channels are silent.
pub fn stereo_to_channels(input: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        2 => out.extend_from_slice(input),
        1 => out.extend(input.chunks_exact(2).map(|f| (f[0] + f[1]) * 0.5)),
        n => {
            for frame in input.chunks_exact(2) {
                out.push(frame[0]);
                out.push(frame[1]);
                out.extend(std::iter::repeat(0.0).take(n - 2));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_is_unity() {
        assert_eq!(balance_gains(0.0), (1.0, 1.0));
    }

    #[test]
    fn hard_pans() {
        assert_eq!(balance_gains(-1.0), (1.0, 0.0));
        assert_eq!(balance_gains(1.0), (0.0, 1.0));
        assert_eq!(balance_gains(0.5), (0.5, 1.0));
    }

    #[test]
    fn stereo_to_device_layouts() {
        let input = [0.2, 0.4, -1.0, 1.0];

        let mut out = Vec::new();
        stereo_to_channels(&input, 2, &mut out);
        assert_eq!(out, input);

        out.clear();
        stereo_to_channels(&input, 1, &mut out);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert_eq!(out[1], 0.0);

        out.clear();
        stereo_to_channels(&input, 4, &mut out);
        assert_eq!(out, vec![0.2, 0.4, 0.0, 0.0, -1.0, 1.0, 0.0, 0.0]);
    }
}
