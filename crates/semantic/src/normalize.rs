use crate::SemanticError;

/// In-place L2 normalization helper to keep allocations down during hot paths.
/// Zero vectors are left untouched.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm_sq: f32 = v.iter().map(|x| x * x).sum();
    if norm_sq > 0.0 {
        let inv_norm = norm_sq.sqrt().recip();
        for x in v.iter_mut() {
            *x *= inv_norm;
        }
    }
}

/// Averages `rows` element-wise. Empty input and rows of differing length are
/// [`SemanticError::Inference`] errors.
pub fn mean_pool(rows: &[Vec<f32>]) -> Result<Vec<f32>, SemanticError> {
    let dim = rows
        .first()
        .ok_or_else(|| SemanticError::Inference("no token states to pool".into()))?
        .len();
    let mut pooled = vec![0.0f32; dim];
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != dim {
            return Err(SemanticError::Inference(format!(
                "token row {idx} has width {} but row 0 has {dim}",
                row.len()
            )));
        }
        for (acc, &val) in pooled.iter_mut().zip(row.iter()) {
            *acc += val;
        }
    }
    let n = rows.len() as f32;
    for val in &mut pooled {
        *val /= n;
    }
    Ok(pooled)
}

/// Mean of token states weighted by the attention mask, the sentence-transformers
/// "mean" pooling. `token_states` is `seq_len * hidden` laid out row-major.
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn masked_mean_pool(token_states: &[f32], mask: &[i64], hidden: usize) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut weight = 0.0f32;
    for (row, &m) in token_states.chunks(hidden).zip(mask.iter()) {
        if m == 0 {
            continue;
        }
        weight += 1.0;
        for (acc, &val) in pooled.iter_mut().zip(row.iter()) {
            *acc += val;
        }
    }
    // sentence-transformers clamps the denominator at 1e-9
    let denom = weight.max(1e-9);
    for val in &mut pooled {
        *val /= denom;
    }
    pooled
}
