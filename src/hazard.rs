//! Piecewise-constant hazard layers.
//!
//! A layer is a step function given by its breakpoints: `{(1,3),(2,6),(5,8)}`
//! means a rate of 3 for t <= 2, 6 for 2 < t <= 5 and 8 beyond. The first
//! coordinate's y also governs everything left of its x. A layer must be
//! sorted by x ascending and hold at least one point.

/// One breakpoint: from `x` onward the rate is `y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

pub type Layer = Vec<Coordinate>;

/// Layer validity: non-empty and x non-decreasing. Used in debug assertions
/// at the layer-consuming entry points.
pub fn is_valid(layer: &Layer) -> bool {
    !layer.is_empty() && layer.windows(2).all(|w| w[0].x <= w[1].x)
}

/// Shifts a layer forward in time (negative amounts shift backward).
pub fn move_forward(layer: &mut Layer, amount: f64) {
    for c in layer.iter_mut() {
        c.x += amount;
    }
}

/// Pointwise product of any number of layers: collect every breakpoint of
/// the inputs, evaluate each input's current rate there, multiply.
pub fn multiply(input_layers: &[Layer]) -> Layer {
    for l in input_layers {
        debug_assert!(is_valid(l), "multiply called with an invalid layer");
    }

    // The first coordinate of each layer changes nothing; every later one
    // does. The leftmost of the first coordinates anchors the result.
    let mut lowest_x = f64::MAX;
    let mut t_change: Vec<f64> = Vec::new();
    for l in input_layers {
        if l[0].x < lowest_x {
            lowest_x = l[0].x;
        }
        for c in &l[1..] {
            t_change.push(c.x);
        }
    }
    t_change.sort_by(|a, b| a.partial_cmp(b).unwrap());
    t_change.dedup();

    // Walk the change points left to right, keeping a cursor per input.
    let multiple = |at_index: &[usize]| -> f64 {
        input_layers
            .iter()
            .zip(at_index)
            .map(|(l, &i)| l[i].y)
            .product()
    };

    let mut at_index = vec![0usize; input_layers.len()];
    let mut result = Layer::with_capacity(t_change.len() + 1);
    result.push(Coordinate {
        x: lowest_x,
        y: multiple(&at_index),
    });
    for t in t_change {
        for (i, l) in input_layers.iter().enumerate() {
            if at_index[i] + 1 < l.len() && l[at_index[i] + 1].x == t {
                at_index[i] += 1;
            }
        }
        result.push(Coordinate {
            x: t,
            y: multiple(&at_index),
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layer(coords: &[(f64, f64)]) -> Layer {
        coords.iter().map(|&(x, y)| Coordinate { x, y }).collect()
    }

    #[test]
    fn validity() {
        assert!(is_valid(&layer(&[(0.0, 1.0)])));
        assert!(is_valid(&layer(&[(0.0, 1.0), (0.0, 2.0), (3.0, 0.5)])));
        assert!(!is_valid(&layer(&[])));
        assert!(!is_valid(&layer(&[(2.0, 1.0), (1.0, 1.0)])));
    }

    #[test]
    fn move_forward_and_back_restores_x() {
        let original = layer(&[(0.0, 1.0), (2.0, 6.0), (5.0, 8.0)]);
        let mut moved = original.clone();
        move_forward(&mut moved, 3.0);
        assert_eq!(moved[0].x, 3.0);
        assert_eq!(moved[2].x, 8.0);
        move_forward(&mut moved, -3.0);
        for (a, b) in moved.iter().zip(&original) {
            assert_eq!(a.x, b.x);
            assert_eq!(a.y, b.y);
        }
    }

    #[test]
    fn multiply_merges_breakpoints() {
        let a = layer(&[(0.0, 2.0), (10.0, 0.0)]);
        let b = layer(&[(0.0, 3.0), (4.0, 1.0)]);
        let product = multiply(&[a, b]);
        assert_eq!(
            product,
            layer(&[(0.0, 6.0), (4.0, 2.0), (10.0, 0.0)])
        );
    }

    #[test]
    fn multiply_dedups_shared_breakpoints() {
        let a = layer(&[(0.0, 2.0), (5.0, 4.0)]);
        let b = layer(&[(0.0, 1.0), (5.0, 0.5)]);
        let product = multiply(&[a, b]);
        assert_eq!(product, layer(&[(0.0, 2.0), (5.0, 2.0)]));
    }

    #[test]
    fn multiply_single_layer_is_identity() {
        let a = layer(&[(-3.0, 2.0), (1.0, 0.25)]);
        assert_eq!(multiply(&[a.clone()]), a);
    }
}
