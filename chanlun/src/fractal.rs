use crate::bar::{Fractal, MergedBar};
use crate::constant::{FractalStrength, Mark};

/// 检查三根连续无包含 K 线是否构成分型。
pub fn detect_fractal(k1: &MergedBar, k2: &MergedBar, k3: &MergedBar) -> Option<Fractal> {
    let mut fractal = None;

    if k1.high_price < k2.high_price && k2.high_price > k3.high_price {
        let strength = if k3.close_price < k1.low_price {
            FractalStrength::Strong
        } else {
            FractalStrength::Weak
        };
        // k1 与 k2 之间无缺口时取 k1 低点，有缺口时取 k2 低点
        let mut low_price = if k1.high_price > k2.low_price {
            k1.low_price
        } else {
            k2.low_price
        };
        if low_price == k2.high_price {
            low_price = k1.low_price;
        }

        fractal = Some(Fractal {
            symbol: k1.symbol.clone(),
            datetime: k2.datetime,
            mark: Mark::Top,
            high_price: k2.high_price,
            low_price,
            extreme: k2.high_price,
            strength,
            elements: [k1.outline(), k2.outline(), k3.outline()],
        });
    }

    if k1.low_price > k2.low_price && k2.low_price < k3.low_price {
        let strength = if k3.close_price > k1.high_price {
            FractalStrength::Strong
        } else {
            FractalStrength::Weak
        };
        let mut high_price = if k1.low_price < k2.high_price {
            k1.high_price
        } else {
            k2.high_price
        };
        if high_price == k2.low_price {
            high_price = k1.high_price;
        }

        fractal = Some(Fractal {
            symbol: k1.symbol.clone(),
            datetime: k2.datetime,
            mark: Mark::Bottom,
            high_price,
            low_price: k2.low_price,
            extreme: k2.low_price,
            strength,
            elements: [k1.outline(), k2.outline(), k3.outline()],
        });
    }

    fractal
}

/// 查找一串无包含 K 线中的全部分型。
///
/// 已接受两个以上分型后，若新分型与最后一个同向，则用新分型替换它。
/// 最前面的一对分型不做修正，极端输入下序列仍可能不严格交替。
pub fn scan_fractals(bars: &[MergedBar]) -> Vec<Fractal> {
    let mut fractals: Vec<Fractal> = Vec::new();
    for window in bars.windows(3) {
        let Some(fractal) = detect_fractal(&window[0], &window[1], &window[2]) else {
            continue;
        };
        if fractals.len() >= 2 && fractals.last().map(|x| x.mark) == Some(fractal.mark) {
            fractals.pop();
        }
        fractals.push(fractal);
    }
    fractals
}
