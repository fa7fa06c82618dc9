//! Level statistics over a response window

/// Root mean square of a signal; 0 for an empty slice.
pub fn rms(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = signal.iter().map(|&x| x * x).sum();
    (sum_sq / signal.len() as f64).sqrt()
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().sum::<f64>() / signal.len() as f64
}

/// Population standard deviation (divides by N); 0 for an empty slice.
pub fn std_dev(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    let m = mean(signal);
    let var = signal.iter().map(|&x| (x - m) * (x - m)).sum::<f64>() / signal.len() as f64;
    var.sqrt()
}

/// Elementwise mean of equal-length traces.
///
/// Traces longer than the first are truncated to its length; shorter traces
/// contribute zeros past their end.
pub fn average_traces<'a, I>(traces: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for trace in traces {
        if count == 0 {
            sum = vec![0.0; trace.len()];
        }
        for (s, &x) in sum.iter_mut().zip(trace) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in &mut sum {
            *s /= count as f64;
        }
    }
    sum
}
