// Copyright (c) 2025 studio-booking
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use std::collections::HashMap;
use std::sync::Arc;

use lazy_static::lazy_static;
use parking_lot::RwLock;

// Struct to hold the color assignments handed out so far. The assigned
// color is persisted on the service row itself; this map only keeps the
// rotation stable while the process runs.
pub struct ServiceColorMap {
    colors: HashMap<String, String>,
    palette: Arc<Vec<String>>,
    next_color_index: usize,
}

impl Default for ServiceColorMap {
    fn default() -> Self {
        Self {
            colors: HashMap::new(),
            // A palette of 10 distinct colors used for the calendar view.
            // These colors are chosen to be relatively distinguishable
            // and work well together.
            palette: Arc::new(vec![
                "#1f77b4".to_string(), // Muted blue
                "#ff7f0e".to_string(), // Orange
                "#2ca02c".to_string(), // Green
                "#d62728".to_string(), // Red
                "#9467bd".to_string(), // Purple
                "#8c564b".to_string(), // Brown
                "#e377c2".to_string(), // Pink
                "#7f7f7f".to_string(), // Grey
                "#bcbd22".to_string(), // Olive
                "#17becf".to_string(), // Cyan
            ]),
            next_color_index: 0,
        }
    }
}

lazy_static! {
    // This is the global, lazily initialized, thread-safe color map.
    static ref SERVICE_COLORS: Arc<RwLock<ServiceColorMap>> =
        Arc::new(RwLock::new(ServiceColorMap::default()));
}

/// Function to get or assign a palette color to a service name. Used
/// when a service is created without an explicit color.
pub fn get_or_assign_service_color(service_name: &str) -> String {
    let mut service_colors = SERVICE_COLORS.write(); // Acquire a write lock
    assign_color(&mut service_colors, service_name)
}

fn assign_color(map: &mut ServiceColorMap, service_name: &str) -> String {
    // Check if the service already has an assigned color
    if let Some(color) = map.colors.get(service_name) {
        return color.clone();
    }

    // If not, assign the next color from the palette
    let color_to_assign = map.palette[map.next_color_index].clone();
    map.colors
        .insert(service_name.to_string(), color_to_assign.clone());

    // Move to the next color in the palette, wrapping around if necessary
    map.next_color_index = (map.next_color_index + 1) % map.palette.len();

    color_to_assign
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to get a clean ServiceColorMap for isolated tests.
    fn get_clean_map() -> ServiceColorMap {
        ServiceColorMap::default()
    }

    #[test]
    fn test_assign_first_color() {
        let mut map = get_clean_map();

        let color = assign_color(&mut map, "Recording Session");

        assert_eq!(color, "#1f77b4");
        assert_eq!(map.colors.get("Recording Session"), Some(&color));
        assert_eq!(map.next_color_index, 1);
    }

    #[test]
    fn test_assign_same_color_for_existing_service() {
        let mut map = get_clean_map();

        let color1 = assign_color(&mut map, "Mixing");
        let color2 = assign_color(&mut map, "Mixing");

        // The color should be the same and the index should not advance
        // the second time.
        assert_eq!(color1, color2);
        assert_eq!(map.next_color_index, 1);
    }

    #[test]
    fn test_assign_different_colors_for_different_services() {
        let mut map = get_clean_map();

        let color1 = assign_color(&mut map, "Recording Session");
        let color2 = assign_color(&mut map, "Mastering");

        assert_ne!(color1, color2);
        assert_eq!(color1, "#1f77b4"); // First color
        assert_eq!(color2, "#ff7f0e"); // Second color
        assert_eq!(map.next_color_index, 2);
    }

    #[test]
    fn test_palette_wraps_around() {
        let mut map = get_clean_map();
        let palette_len = map.palette.len();

        // Exhaust the palette
        for i in 0..palette_len {
            let service_name = format!("Service {}", i);
            assign_color(&mut map, &service_name);
        }

        assert_eq!(map.next_color_index, 0);

        let next_color = assign_color(&mut map, "Service After Wrap");

        assert_eq!(next_color, map.palette[0]);
        assert_eq!(map.next_color_index, 1);
    }
}
