use std::ops::Range;

/**
 * Maps a player id to its contiguous slices of the flat vertex/link/face
 * arrays. All players own ranges of the same size, so the mapping is pure
 * index arithmetic and never changes after construction.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerLayout {
    pub player_count: usize,
    pub verts_per_player: usize,
    pub links_per_player: usize,
    pub faces_per_player: usize,
}

impl PlayerLayout {
    pub fn vert_count(&self) -> usize {
        self.player_count * self.verts_per_player
    }

    pub fn link_count(&self) -> usize {
        self.player_count * self.links_per_player
    }

    pub fn face_count(&self) -> usize {
        self.player_count * self.faces_per_player
    }

    pub fn player_vert(&self, player: usize, local: usize) -> usize {
        debug_assert!(local < self.verts_per_player);
        player * self.verts_per_player + local
    }

    pub fn player_link(&self, player: usize, local: usize) -> usize {
        debug_assert!(local < self.links_per_player);
        player * self.links_per_player + local
    }

    pub fn player_face(&self, player: usize, local: usize) -> usize {
        debug_assert!(local < self.faces_per_player);
        player * self.faces_per_player + local
    }

    pub fn vert_player(&self, vert: usize) -> usize {
        vert / self.verts_per_player
    }

    pub fn vert_local(&self, vert: usize) -> usize {
        vert % self.verts_per_player
    }

    pub fn player_verts(&self, player: usize) -> Range<usize> {
        player * self.verts_per_player..(player + 1) * self.verts_per_player
    }

    pub fn player_links(&self, player: usize) -> Range<usize> {
        player * self.links_per_player..(player + 1) * self.links_per_player
    }

    pub fn player_faces(&self, player: usize) -> Range<usize> {
        player * self.faces_per_player..(player + 1) * self.faces_per_player
    }
}

#[test]
fn player_index_roundtrip() {
    let layout = PlayerLayout {
        player_count: 20,
        verts_per_player: 32,
        links_per_player: 96,
        faces_per_player: 0,
    };

    assert_eq!(layout.vert_count(), 640);
    assert_eq!(layout.link_count(), 1920);

    for player in 0..layout.player_count {
        for local in 0..layout.verts_per_player {
            let vert = layout.player_vert(player, local);
            assert_eq!(layout.vert_player(vert), player);
            assert_eq!(layout.vert_local(vert), local);
            assert!(layout.player_verts(player).contains(&vert));
        }
    }
}

#[test]
fn player_ranges_do_not_overlap() {
    let layout = PlayerLayout {
        player_count: 3,
        verts_per_player: 7,
        links_per_player: 12,
        faces_per_player: 8,
    };

    for player in 1..layout.player_count {
        assert_eq!(layout.player_verts(player - 1).end, layout.player_verts(player).start);
        assert_eq!(layout.player_links(player - 1).end, layout.player_links(player).start);
        assert_eq!(layout.player_faces(player - 1).end, layout.player_faces(player).start);
    }
    assert_eq!(layout.player_verts(2).end, layout.vert_count());
    assert_eq!(layout.player_faces(2).end, layout.face_count());
}
