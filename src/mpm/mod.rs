//! Pitch period candidates from a normalized autocorrelation function, as
//! described in the paper [A smarter way to find pitch](http://www.cs.otago.ac.nz/tartini/papers/A_Smarter_Way_to_Find_Pitch.pdf)
//! by Philip McLeod and Geoff Wyvill.
//!
//! Key maxima are the highest points of the positive lobes of the
//! autocorrelation function. The pitch period is taken to be the first key
//! maximum that is almost as high as the highest one, which makes the choice
//! robust against octave errors.

mod key_maximum;
mod peak_picking;

pub use key_maximum::{interpolated_peak_lag, KeyMaximum};
pub use peak_picking::{find_highest_peak_lag, find_key_maxima, pick_best_maximum, KeyMaxima};
