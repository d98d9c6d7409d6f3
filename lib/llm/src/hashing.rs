//! Feature hashing of text into fixed-size vectors.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hash text into a unit vector of dimension `dim`.
///
/// Every lowercase alphanumeric word contributes to one bucket and each of
/// its character trigrams to another, so texts sharing words or word
/// fragments end up close. Text without any word maps to the zero vector.
pub fn hash_text_to_vector(text: &str, dim: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dim];
    if dim == 0 {
        return vector;
    }

    let normalized = text.to_lowercase();
    for word in normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[bucket(word, dim)] += 2.0; // Words contribute more

        let padded: Vec<char> = format!(" {} ", word).chars().collect();
        for trigram in padded.windows(3) {
            let trigram: String = trigram.iter().collect();
            vector[bucket(&trigram, dim)] += 1.0;
        }
    }

    let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for v in &mut vector {
            *v /= magnitude;
        }
    }

    vector
}

fn bucket(token: &str, dim: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    (hasher.finish() as usize) % dim
}
