//! Cesium entity directives for a [`Scene`]

use crate::scene::{LinkLine, NodeMarker, Paint, Scene};

fn material(paint: &Paint) -> String {
    format!(
        "Cesium.Color.fromCssColorString('{}').withAlpha({})",
        paint.css.replace('\'', "\\'"),
        paint.alpha
    )
}

pub fn marker_directive(marker: &NodeMarker) -> String {
    format!(
        "var redSphere = viewer.entities.add({{name : '', \
         position: Cesium.Cartesian3.fromDegrees({}, {}, {}), \
         ellipsoid : {{radii : new Cesium.Cartesian3({r}, {r}, {r}), material : {},}}}});\n",
        marker.sublong_deg,
        marker.sublat_deg,
        marker.altitude_m,
        material(&marker.paint),
        r = marker.radius_m,
    )
}

pub fn polyline_directive(line: &LinkLine) -> String {
    let [lon_a, lat_a, h_a] = line.from;
    let [lon_b, lat_b, h_b] = line.to;
    format!(
        "viewer.entities.add({{name : '', polyline: {{ \
         positions: Cesium.Cartesian3.fromDegreesArrayHeights([{},{},{},{},{},{}]), \
         width: {}, arcType: Cesium.ArcType.NONE, \
         material: new Cesium.PolylineOutlineMaterialProperty({{ \
         color: {}, outlineWidth: 0, outlineColor: Cesium.Color.BLACK}})}}}});\n",
        lon_a,
        lat_a,
        h_a,
        lon_b,
        lat_b,
        h_b,
        line.width,
        material(&line.paint),
    )
}

/// One entity directive per marker, then one polyline directive per link.
pub fn to_cesium_script(scene: &Scene) -> String {
    let mut script = String::with_capacity(scene.nodes.len() * 220 + scene.links.len() * 320);
    for marker in &scene.nodes {
        script.push_str(&marker_directive(marker));
    }
    for line in &scene.links {
        script.push_str(&polyline_directive(line));
    }
    script
}
