/*!
Game-rule topology edits. Vertices only ever go from enabled to disabled
within a round; a full reset is the only way back. Every operation ends by
invalidating the links and faces that touch a freshly disabled vertex, so
the cascade rule (no active link/face references a disabled vertex) holds
between any two operations.
*/

use crate::floating_type_mod::FT;
use crate::mesh_state::MeshState;
use crate::{vec2i, vec3i, V2};

/// Disable every enabled vertex within `radius + margin` of `center`.
/// The caller passes the collision radius as margin so a blast also takes
/// out vertices whose collision disc overlaps the area.
pub fn destroy_in_radius(mesh: &mut MeshState, center: V2, radius: FT, margin: FT) {
    for i in 0..mesh.vert_count() {
        if !mesh.verts.enabled[i] {
            continue;
        }
        if (mesh.verts.position[i] - center).norm() < radius + margin {
            mesh.verts.enabled[i] = false;
        }
    }
    invalidate_dangling(mesh);
}

/// Disable every enabled vertex outside the ring. The arena shrinks the
/// radius over time to force the remaining players together.
pub fn destroy_outside_ring(mesh: &mut MeshState, center: V2, radius: FT) {
    for i in 0..mesh.vert_count() {
        if !mesh.verts.enabled[i] {
            continue;
        }
        if (mesh.verts.position[i] - center).norm() > radius {
            mesh.verts.enabled[i] = false;
        }
    }
    invalidate_dangling(mesh);
}

/// Disable every enabled vertex outside the axis-aligned play area.
pub fn kill_outside_borders(mesh: &mut MeshState, min: V2, max: V2) {
    for i in 0..mesh.vert_count() {
        if !mesh.verts.enabled[i] {
            continue;
        }
        let position = mesh.verts.position[i];
        if position.x < min.x || position.x > max.x || position.y < min.y || position.y > max.y {
            mesh.verts.enabled[i] = false;
        }
    }
    invalidate_dangling(mesh);
}

/// Force-disable a whole player: its vertex range and its link/face ranges.
pub fn kill_player(mesh: &mut MeshState, player: usize) {
    let layout = mesh.layout;
    for i in layout.player_verts(player) {
        mesh.verts.enabled[i] = false;
    }
    for l in layout.player_links(player) {
        mesh.links[l] = vec2i(-1, -1);
    }
    for f in layout.player_faces(player) {
        mesh.faces[f] = vec3i(-1, -1, -1);
    }
}

/// Invalidate every link and face that references a disabled vertex.
pub fn invalidate_dangling(mesh: &mut MeshState) {
    let MeshState {
        verts, links, faces, ..
    } = mesh;
    let enabled = &verts.enabled;

    for link in links.iter_mut() {
        if link[0] < 0 {
            continue;
        }
        if !enabled[link[0] as usize] || !enabled[link[1] as usize] {
            *link = vec2i(-1, -1);
        }
    }
    for face in faces.iter_mut() {
        if face[0] < 0 {
            continue;
        }
        if !enabled[face[0] as usize] || !enabled[face[1] as usize] || !enabled[face[2] as usize] {
            *face = vec3i(-1, -1, -1);
        }
    }
}

/// Cascade-rule check for tests and debug assertions.
pub fn no_dangling_topology(mesh: &MeshState) -> bool {
    let enabled = &mesh.verts.enabled;
    let links_ok = mesh.links.iter().all(|link| {
        link[0] < 0 || (enabled[link[0] as usize] && enabled[link[1] as usize])
    });
    let faces_ok = mesh.faces.iter().all(|face| {
        face[0] < 0
            || (enabled[face[0] as usize]
                && enabled[face[1] as usize]
                && enabled[face[2] as usize])
    });
    links_ok && faces_ok
}
