pub(crate) fn approx_eq_f64(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON
}

/// 按位数舍入，恰为一半时取偶数（银行家舍入）。
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round_ties_even() / scale
}

/// 拟合优度 R²：收盘价对序号做最小二乘直线拟合，结果保留 4 位小数。
pub fn rsq(values: &[f64]) -> f64 {
    let num = values.len() as f64;
    let x_sum: f64 = (0..values.len()).map(|x| x as f64).sum();
    let x_squared_sum: f64 = (0..values.len()).map(|x| (x * x) as f64).sum();
    let xy_sum: f64 = values.iter().enumerate().map(|(x, y)| x as f64 * y).sum();
    let y_sum: f64 = values.iter().sum();

    let delta = num * x_squared_sum - x_sum * x_sum;
    if approx_eq_f64(delta, 0.0) {
        return 0.0;
    }

    let intercept = (x_squared_sum * y_sum - x_sum * xy_sum) / delta;
    let slope = (num * xy_sum - x_sum * y_sum) / delta;
    let y_mean = y_sum / num;

    let ss_tot = values.iter().map(|y| (y - y_mean).powi(2)).sum::<f64>() + 0.00001;
    let ss_err: f64 = values
        .iter()
        .enumerate()
        .map(|(x, y)| (y - slope * x as f64 - intercept).powi(2))
        .sum();
    round_to(1.0 - ss_err / ss_tot, 4)
}

/// 取 `items` 倒数第 `end_offset` 个位置之前、长度不超过 `len` 的窗口。
/// 越界时自动截断，与序列较短时的取窗语义一致。
pub(crate) fn trailing_window<T>(items: &[T], end_offset: usize, len: usize) -> &[T] {
    let end = items.len().saturating_sub(end_offset);
    let start = end.saturating_sub(len);
    &items[start..end]
}
