use core::convert::TryInto;

use microfft::Complex32;

use crate::error::Error;

/// The smallest FFT size supported by [fft_in_place].
pub const MIN_FFT_SIZE: usize = 8;
/// The largest FFT size supported by [fft_in_place].
pub const MAX_FFT_SIZE: usize = 4096;

macro_rules! dispatch_cfft {
    ($buffer:expr, $($size:literal => $transform:path),+ $(,)?) => {
        match $buffer.len() {
            $(
                $size => {
                    let buffer: &mut [Complex32; $size] = $buffer
                        .try_into()
                        .map_err(|_| Error::UnsupportedFftSize($size))?;
                    let _ = $transform(buffer);
                    Ok(())
                }
            )+
            size => Err(Error::UnsupportedFftSize(size)),
        }
    };
}

/// Performs an in-place forward complex FFT.
/// The buffer length must be a power of two between [MIN_FFT_SIZE] and [MAX_FFT_SIZE].
pub fn fft_in_place(buffer: &mut [Complex32]) -> Result<(), Error> {
    dispatch_cfft!(
        buffer,
        8 => microfft::complex::cfft_8,
        16 => microfft::complex::cfft_16,
        32 => microfft::complex::cfft_32,
        64 => microfft::complex::cfft_64,
        128 => microfft::complex::cfft_128,
        256 => microfft::complex::cfft_256,
        512 => microfft::complex::cfft_512,
        1024 => microfft::complex::cfft_1024,
        2048 => microfft::complex::cfft_2048,
        4096 => microfft::complex::cfft_4096,
    )
}

/// Indicates if `fft_in_place` can transform a buffer of a given length.
pub fn is_supported_fft_size(size: usize) -> bool {
    size.is_power_of_two() && (MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn test_impulse_has_flat_spectrum() {
        let mut buffer = vec![Complex32::new(0.0, 0.0); 16];
        buffer[0].re = 1.0;
        fft_in_place(&mut buffer).unwrap();
        for value in buffer.iter() {
            assert!((value.re - 1.0).abs() < 1e-6);
            assert!(value.im.abs() < 1e-6);
        }
    }

    #[test]
    fn test_unsupported_size() {
        let mut buffer = vec![Complex32::new(0.0, 0.0); 12];
        assert_eq!(
            fft_in_place(&mut buffer),
            Err(Error::UnsupportedFftSize(12))
        );
        assert!(!is_supported_fft_size(12));
        assert!(!is_supported_fft_size(8192));
        assert!(is_supported_fft_size(4096));
    }
}
