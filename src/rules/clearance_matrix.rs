use serde::{Deserialize, Serialize};

/// Required distance between items of two clearance classes, per layer.
///
/// Class 0 is the "null" class that keeps no distance to anything, class 1
/// is the default class new classes copy their values from. All stored
/// values are even, since half of a clearance is used to inflate shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceMatrix {
    layer_count: usize,
    rows: Vec<ClearanceRow>,
    max_value_on_layer: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ClearanceRow {
    name: String,
    // column class -> layer -> value
    columns: Vec<Vec<i64>>,
    max_value: Vec<i64>,
}

impl ClearanceRow {
    fn new(name: String, class_count: usize, layer_count: usize) -> Self {
        Self {
            name,
            columns: vec![vec![0; layer_count]; class_count],
            max_value: vec![0; layer_count],
        }
    }
}

impl ClearanceMatrix {
    pub fn new(layer_count: usize, default_value: i64) -> Self {
        let layer_count = layer_count.max(1);
        let mut matrix = Self {
            layer_count,
            rows: ["null", "default"]
                .iter()
                .map(|name| ClearanceRow::new(name.to_string(), 2, layer_count))
                .collect(),
            max_value_on_layer: vec![0; layer_count],
        };
        matrix.set_default_value(default_value);
        matrix
    }

    pub fn class_count(&self) -> usize {
        self.rows.len()
    }

    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Case-insensitive lookup of a class by name.
    pub fn class_no(&self, name: &str) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.name.eq_ignore_ascii_case(name))
    }

    pub fn class_name(&self, class: usize) -> Option<&str> {
        self.rows.get(class).map(|row| row.name.as_str())
    }

    /// Sets the value between all non-null classes on all layers.
    pub fn set_default_value(&mut self, value: i64) {
        for layer in 0..self.layer_count {
            self.set_default_value_on_layer(layer, value);
        }
    }

    pub fn set_default_value_on_layer(&mut self, layer: usize, value: i64) {
        for i in 1..self.class_count() {
            for j in 1..self.class_count() {
                self.set_value_on_layer(i, j, layer, value);
            }
        }
    }

    pub fn set_value(&mut self, i: usize, j: usize, value: i64) {
        for layer in 0..self.layer_count {
            self.set_value_on_layer(i, j, layer, value);
        }
    }

    /// Sets both `(i, j)` and `(j, i)`. Negative values become 0 and odd
    /// values are rounded up to the next even one.
    pub fn set_value_on_layer(&mut self, i: usize, j: usize, layer: usize, value: i64) {
        if i >= self.class_count() || j >= self.class_count() || layer >= self.layer_count {
            log::warn!(
                "clearance entry ({}, {}) on layer {} is out of range",
                i,
                j,
                layer
            );
            return;
        }

        let mut value = value.max(0);
        value += value % 2;

        for (row, column) in [(j, i), (i, j)] {
            let row = &mut self.rows[row];
            row.columns[column][layer] = value;
            row.max_value[layer] = row.max_value[layer].max(value);
        }

        self.max_value_on_layer[layer] = self.max_value_on_layer[layer].max(value);
    }

    /// Required clearance, 0 for anything out of range.
    pub fn value(&self, i: usize, j: usize, layer: usize) -> i64 {
        if i >= self.class_count() || j >= self.class_count() || layer >= self.layer_count {
            return 0;
        }

        self.rows[j].columns[i][layer]
    }

    /// Largest clearance of `class` to any class on `layer`. Out of range
    /// arguments are clamped.
    pub fn max_value(&self, class: usize, layer: usize) -> i64 {
        let class = class.min(self.class_count() - 1);
        let layer = layer.min(self.layer_count - 1);
        self.rows[class].max_value[layer]
    }

    pub fn max_value_on_layer(&self, layer: usize) -> i64 {
        self.max_value_on_layer[layer.min(self.layer_count - 1)]
    }

    /// Half of the clearance of a class to itself, rounded up. Shapes stored
    /// with this much enlargement can be compared by plain overlap.
    pub fn compensation(&self, class: usize, layer: usize) -> i64 {
        (self.value(class, class, layer) + 1) / 2
    }

    pub fn is_layer_dependent(&self, i: usize, j: usize) -> bool {
        let first = self.value(i, j, 0);
        (1..self.layer_count).any(|layer| self.value(i, j, layer) != first)
    }

    /// Adds a class whose values are copied from the default class. Returns
    /// false if a class of that name exists already.
    pub fn append_class(&mut self, name: &str) -> bool {
        if self.class_no(name).is_some() {
            return false;
        }

        let new_class = self.class_count();

        for row in self.rows.iter_mut() {
            row.columns.push(vec![0; self.layer_count]);
        }

        self.rows.push(ClearanceRow::new(
            name.to_string(),
            new_class + 1,
            self.layer_count,
        ));

        for class in 0..new_class {
            for layer in 0..self.layer_count {
                let default_value = self.value(1, class, layer);
                self.set_value_on_layer(new_class, class, layer, default_value);
            }
        }

        for layer in 0..self.layer_count {
            let default_value = self.value(1, 1, layer);
            self.set_value_on_layer(new_class, new_class, layer, default_value);
        }

        true
    }

    /// True if both classes require the same clearances to every non-null
    /// class.
    pub fn is_equal(&self, class1: usize, class2: usize) -> bool {
        if class1 == class2 {
            return true;
        }

        if class1 >= self.class_count() || class2 >= self.class_count() {
            return false;
        }

        (1..self.class_count())
            .all(|i| self.rows[class1].columns[i] == self.rows[class2].columns[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn odd_values_are_rounded_up() {
        let mut matrix = ClearanceMatrix::new(2, 0);
        matrix.set_value(1, 1, 101);
        assert_eq!(matrix.value(1, 1, 0), 102);
        assert_eq!(matrix.value(1, 1, 1), 102);
        matrix.set_value(1, 1, -5);
        assert_eq!(matrix.value(1, 1, 0), 0);
    }

    #[test]
    fn null_class_keeps_no_distance() {
        let matrix = ClearanceMatrix::new(1, 200);
        assert_eq!(matrix.value(0, 1, 0), 0);
        assert_eq!(matrix.value(1, 1, 0), 200);
        assert_eq!(matrix.value(5, 1, 0), 0);
        assert_eq!(matrix.compensation(1, 0), 100);
    }

    #[test]
    fn appended_class_copies_default() {
        let mut matrix = ClearanceMatrix::new(1, 150);
        assert!(matrix.append_class("power"));
        assert!(!matrix.append_class("POWER"));
        let power = matrix.class_no("power").unwrap();
        assert_eq!(matrix.value(power, 1, 0), 150);
        assert_eq!(matrix.value(power, power, 0), 150);
        assert!(matrix.is_equal(power, 1));

        matrix.set_value(power, 1, 300);
        assert_eq!(matrix.value(1, power, 0), 300);
        assert_eq!(matrix.max_value(1, 0), 300);
        assert_eq!(matrix.max_value_on_layer(0), 300);
        assert!(!matrix.is_equal(power, 1));
    }
}
